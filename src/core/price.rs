//! Pricing abstractions and core types

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

/// Marker served in place of a price when upstream has no quote for an asset.
pub const UNAVAILABLE: &str = "N/A";

/// Fixed message carried in the `error` field of every failed fetch.
pub const FETCH_FAILED: &str = "Failed to fetch cryptocurrency prices";

/// Price of a single asset as served to clients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quote {
    Price(f64),
    Unavailable,
}

impl Serialize for Quote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Quote::Price(price) => serializer.serialize_f64(*price),
            Quote::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

/// Lower-cased asset identifier to quote, one entry per configured asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceMap(BTreeMap<String, Quote>);

impl PriceMap {
    /// Builds a map holding exactly one entry per asset. Assets the lookup
    /// cannot resolve are recorded as [`Quote::Unavailable`].
    pub fn from_lookup<F>(assets: &[String], mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let quotes = assets
            .iter()
            .map(|asset| {
                let quote = lookup(asset).map_or(Quote::Unavailable, Quote::Price);
                (asset.to_lowercase(), quote)
            })
            .collect();
        PriceMap(quotes)
    }

    pub fn get(&self, asset: &str) -> Option<&Quote> {
        self.0.get(&asset.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn unavailable_count(&self) -> usize {
        self.0
            .values()
            .filter(|q| matches!(q, Quote::Unavailable))
            .count()
    }
}

/// What to ask upstream for: the asset list and the quote currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub assets: Vec<String>,
    pub currency: String,
}

impl PriceQuery {
    pub fn new(assets: Vec<String>, currency: impl Into<String>) -> Self {
        Self {
            assets,
            currency: currency.into(),
        }
    }

    /// Comma separated asset list, as upstream query parameters expect it.
    pub fn joined_assets(&self) -> String {
        self.assets.join(",")
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse upstream response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("upstream reported error {code}: {message}")]
    Provider { code: i64, message: String },
}

/// Body served alongside a 500 when a fetch fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResult {
    pub error: String,
    pub details: String,
}

impl From<&FetchError> for ErrorResult {
    fn from(err: &FetchError) -> Self {
        ErrorResult {
            error: FETCH_FAILED.to_string(),
            details: err.to_string(),
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Issues one upstream request and normalizes it into a [`PriceMap`].
    async fn fetch_prices(&self) -> Result<PriceMap, FetchError>;
}
