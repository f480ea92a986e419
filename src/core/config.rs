use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::core::price::PriceQuery;

pub const DEFAULT_PORT: u16 = 3000;
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CoinMarketCapConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        CoinMarketCapConfig {
            base_url: "https://pro-api.coinmarketcap.com".to_string(),
            api_key_env: "CMC_PRO_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    /// Environment variable holding the API key. The key is optional for the
    /// public endpoint.
    pub api_key_env: String,
    pub api_key_header: String,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        CoinGeckoConfig {
            base_url: "https://api.coingecko.com".to_string(),
            api_key_env: "COINGECKO_API_KEY".to_string(),
            api_key_header: "x-cg-demo-api-key".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    CoinMarketCap(CoinMarketCapConfig),
    CoinGecko(CoinGeckoConfig),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::CoinGecko(CoinGeckoConfig::default())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub assets: Vec<String>,
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            assets: ["bitcoin", "ethereum", "solana", "cardano", "ripple"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            currency: "USD".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinrelay", "coinrelay")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies the `PORT` environment variable on top of the file config.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(port) = parse_port(std::env::var(PORT_ENV).ok().as_deref())? {
            debug!(port, "Port taken from environment");
            self.server.port = port;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            bail!("No assets configured");
        }
        if self.currency.trim().is_empty() {
            bail!("Quote currency must not be empty");
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.trim().is_empty() {
                bail!("Asset identifiers must not be empty");
            }
            if !seen.insert(asset.to_lowercase()) {
                bail!("Duplicate asset identifier: {asset}");
            }
        }
        Ok(())
    }

    pub fn price_query(&self) -> PriceQuery {
        PriceQuery::new(self.assets.clone(), self.currency.clone())
    }
}

fn parse_port(raw: Option<&str>) -> Result<Option<u16>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u16>()
            .map(Some)
            .with_context(|| format!("Invalid {PORT_ENV} value: {value}")),
    }
}
