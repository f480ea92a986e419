use crate::core::price::FetchError;
use anyhow::Context;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

const USER_AGENT: &str = concat!("coinrelay/", env!("CARGO_PKG_VERSION"));

/// Provider-level status block embedded in a response body.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    error_code: i64,
    error_message: Option<String>,
}

/// Builds a client that sends `api_key` under `header` on every request.
pub fn build_client(header: Option<(&str, &str)>) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some((name, key)) = header {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid API key header name: {name}"))?;
        let mut value = HeaderValue::from_str(key).context("Invalid API key value")?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .context("Failed to build HTTP client")
}

/// Joins `path` onto `base_url`, tolerating a trailing slash on the base.
pub fn endpoint(base_url: &str, path: &str) -> anyhow::Result<Url> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), path);
    Url::parse(&raw).with_context(|| format!("Invalid provider URL: {raw}"))
}

/// Issues the GET and returns the parsed body once status and embedded error
/// checks have passed.
pub async fn fetch_json(client: &reqwest::Client, url: Url) -> Result<Value, FetchError> {
    debug!(%url, "Requesting prices");
    let response = client.get(url).send().await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        error!(%status, body = %text, "Upstream request failed");
        return Err(FetchError::Status { status, body: text });
    }

    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(e) => {
            error!(error = ?e, response = %text, "Failed to parse price response");
            return Err(e.into());
        }
    };

    check_embedded_status(&body)?;
    Ok(body)
}

fn check_embedded_status(body: &Value) -> Result<(), FetchError> {
    let Some(status) = body.get("status").filter(|s| s.is_object()) else {
        return Ok(());
    };
    let status = ApiStatus::deserialize(status)?;
    if status.error_code != 0 {
        return Err(FetchError::Provider {
            code: status.error_code,
            message: status
                .error_message
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    Ok(())
}
