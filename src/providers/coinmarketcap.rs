use super::util::{build_client, endpoint, fetch_json};
use crate::core::price::{FetchError, PriceMap, PriceProvider, PriceQuery};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{info, instrument};

pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";
const QUOTES_PATH: &str = "/v2/cryptocurrency/quotes/latest";

/// Quotes by ticker symbol from the CoinMarketCap pro API.
pub struct CoinMarketCapProvider {
    client: reqwest::Client,
    endpoint: Url,
    query: PriceQuery,
}

impl CoinMarketCapProvider {
    pub fn new(base_url: &str, api_key: &str, query: PriceQuery) -> anyhow::Result<Self> {
        Ok(CoinMarketCapProvider {
            client: build_client(Some((API_KEY_HEADER, api_key)))?,
            endpoint: endpoint(base_url, QUOTES_PATH)?,
            query,
        })
    }

    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("symbol", &self.query.joined_assets())
            .append_pair("convert", &self.query.currency)
            .append_pair("skip_invalid", "true");
        url
    }
}

/// `data[SYMBOL][0].quote[CURRENCY].price`
fn lookup_price(body: &Value, symbol: &str, currency: &str) -> Option<f64> {
    body.get("data")?
        .get(symbol)?
        .get(0)?
        .get("quote")?
        .get(currency)?
        .get("price")?
        .as_f64()
}

#[async_trait]
impl PriceProvider for CoinMarketCapProvider {
    fn name(&self) -> &'static str {
        "coinmarketcap"
    }

    #[instrument(
        name = "CoinMarketCapFetch",
        skip(self),
        fields(assets = %self.query.joined_assets())
    )]
    async fn fetch_prices(&self) -> Result<PriceMap, FetchError> {
        let body = fetch_json(&self.client, self.request_url()).await?;

        let prices = PriceMap::from_lookup(&self.query.assets, |symbol| {
            lookup_price(&body, symbol, &self.query.currency)
        });
        info!(
            count = prices.len(),
            unavailable = prices.unavailable_count(),
            "Fetched prices"
        );
        Ok(prices)
    }
}
