pub mod coingecko;
pub mod coinmarketcap;
pub mod util;

use crate::core::config::{AppConfig, ProviderConfig};
use crate::core::price::PriceProvider;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

pub use coingecko::CoinGeckoProvider;
pub use coinmarketcap::CoinMarketCapProvider;

/// Builds the provider named in `config`, reading API keys from the
/// environment.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn PriceProvider>> {
    from_config_with(config, |name| std::env::var(name).ok())
}

/// Same as [`from_config`] with an explicit source for secrets.
pub fn from_config_with<F>(config: &AppConfig, secret: F) -> Result<Arc<dyn PriceProvider>>
where
    F: Fn(&str) -> Option<String>,
{
    config.validate()?;
    let query = config.price_query();

    let provider: Arc<dyn PriceProvider> = match &config.provider {
        ProviderConfig::CoinMarketCap(cmc) => {
            let api_key = secret(&cmc.api_key_env)
                .filter(|k| !k.is_empty())
                .with_context(|| {
                    format!(
                        "CoinMarketCap API key not set, export {}",
                        cmc.api_key_env
                    )
                })?;
            Arc::new(CoinMarketCapProvider::new(&cmc.base_url, &api_key, query)?)
        }
        ProviderConfig::CoinGecko(gecko) => {
            let api_key = secret(&gecko.api_key_env).filter(|k| !k.is_empty());
            if api_key.is_none() {
                warn!(
                    env = %gecko.api_key_env,
                    "No CoinGecko API key set, using the public rate limit"
                );
            }
            let header = api_key
                .as_deref()
                .map(|key| (gecko.api_key_header.as_str(), key));
            Arc::new(CoinGeckoProvider::new(&gecko.base_url, header, query)?)
        }
    };

    debug!(provider = provider.name(), "Price provider ready");
    Ok(provider)
}
