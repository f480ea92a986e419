use super::util::{build_client, endpoint, fetch_json};
use crate::core::price::{FetchError, PriceMap, PriceProvider, PriceQuery};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{info, instrument};

const SIMPLE_PRICE_PATH: &str = "/api/v3/simple/price";

/// Quotes by coin id (`bitcoin`, `ethereum`, ...) from CoinGecko's simple
/// price endpoint.
pub struct CoinGeckoProvider {
    client: reqwest::Client,
    endpoint: Url,
    query: PriceQuery,
    vs_currency: String,
}

impl CoinGeckoProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<(&str, &str)>,
        query: PriceQuery,
    ) -> anyhow::Result<Self> {
        let vs_currency = query.currency.to_lowercase();
        Ok(CoinGeckoProvider {
            client: build_client(api_key)?,
            endpoint: endpoint(base_url, SIMPLE_PRICE_PATH)?,
            query,
            vs_currency,
        })
    }

    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("ids", &self.query.joined_assets())
            .append_pair("vs_currencies", &self.vs_currency);
        url
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    #[instrument(
        name = "CoinGeckoFetch",
        skip(self),
        fields(assets = %self.query.joined_assets())
    )]
    async fn fetch_prices(&self) -> Result<PriceMap, FetchError> {
        let body = fetch_json(&self.client, self.request_url()).await?;

        // body[id][currency]
        let prices = PriceMap::from_lookup(&self.query.assets, |id| {
            body.get(id)?.get(&self.vs_currency)?.as_f64()
        });
        info!(
            count = prices.len(),
            unavailable = prices.unavailable_count(),
            "Fetched prices"
        );
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::Quote;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_JSON: &str = r#"{
        "bitcoin": {"usd": 64000.12},
        "ethereum": {"usd": 3000}
    }"#;

    fn query(ids: &[&str]) -> PriceQuery {
        PriceQuery::new(ids.iter().map(|s| s.to_string()).collect(), "USD")
    }

    async fn create_mock_server(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIMPLE_PRICE_PATH))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_fetch_prices() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIMPLE_PRICE_PATH))
            .and(query_param("ids", "bitcoin,ethereum"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_JSON))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider =
            CoinGeckoProvider::new(&mock_server.uri(), None, query(&["bitcoin", "ethereum"]))
                .unwrap();
        let prices = provider.fetch_prices().await.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices.get("bitcoin"), Some(&Quote::Price(64000.12)));
        assert_eq!(prices.get("ethereum"), Some(&Quote::Price(3000.0)));
    }

    #[tokio::test]
    async fn test_sends_api_key_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIMPLE_PRICE_PATH))
            .and(header("x-cg-demo-api-key", "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_JSON))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = CoinGeckoProvider::new(
            &mock_server.uri(),
            Some(("x-cg-demo-api-key", "demo-key")),
            query(&["bitcoin"]),
        )
        .unwrap();
        let prices = provider.fetch_prices().await.unwrap();
        assert_eq!(prices.get("bitcoin"), Some(&Quote::Price(64000.12)));
    }

    #[tokio::test]
    async fn test_missing_id_is_unavailable() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(MOCK_JSON)).await;
        let provider = CoinGeckoProvider::new(
            &mock_server.uri(),
            None,
            query(&["bitcoin", "ethereum", "dogecoin"]),
        )
        .unwrap();

        let prices = provider.fetch_prices().await.unwrap();
        assert_eq!(prices.len(), 3);
        assert_eq!(prices.get("dogecoin"), Some(&Quote::Unavailable));
        assert_eq!(prices.get("ethereum"), Some(&Quote::Price(3000.0)));
    }

    #[tokio::test]
    async fn test_rate_limited_status() {
        let body = r#"{"status": {"error_code": 429, "error_message": "You've exceeded the Rate Limit."}}"#;
        let mock_server = create_mock_server(ResponseTemplate::new(429).set_body_string(body)).await;
        let provider =
            CoinGeckoProvider::new(&mock_server.uri(), None, query(&["bitcoin"])).unwrap();

        let err = provider.fetch_prices().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { .. }));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Rate Limit"));
    }

    #[tokio::test]
    async fn test_embedded_error_with_success_status() {
        let body = r#"{"status": {"error_code": 10002, "error_message": "invalid api key"}}"#;
        let mock_server = create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
        let provider =
            CoinGeckoProvider::new(&mock_server.uri(), None, query(&["bitcoin"])).unwrap();

        match provider.fetch_prices().await {
            Err(FetchError::Provider { code, message }) => {
                assert_eq!(code, 10002);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("Expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_numeric_price_is_unavailable() {
        let body = r#"{"bitcoin": {"usd": "lots"}, "ethereum": {}}"#;
        let mock_server = create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
        let provider =
            CoinGeckoProvider::new(&mock_server.uri(), None, query(&["bitcoin", "ethereum"]))
                .unwrap();

        let prices = provider.fetch_prices().await.unwrap();
        assert_eq!(prices.unavailable_count(), 2);
    }

    #[tokio::test]
    async fn test_network_failure() {
        // Nothing listens on a port that was bound and released.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = CoinGeckoProvider::new(&uri, None, query(&["bitcoin"])).unwrap();
        let err = provider.fetch_prices().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert!(err.to_string().starts_with("request failed"));
    }

    #[test]
    fn test_request_url_lowercases_currency() {
        let provider =
            CoinGeckoProvider::new("https://api.coingecko.com", None, query(&["bitcoin", "solana"]))
                .unwrap();
        assert_eq!(
            provider.request_url().as_str(),
            "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin%2Csolana&vs_currencies=usd"
        );
    }
}
