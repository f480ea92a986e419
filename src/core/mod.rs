//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use config::AppConfig;
pub use price::{ErrorResult, FetchError, PriceMap, PriceProvider, PriceQuery, Quote};
