pub mod core;
pub mod providers;
pub mod server;

use crate::core::config::AppConfig;
use crate::core::price::ErrorResult;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub enum AppCommand {
    Serve { port: Option<u16> },
    Fetch,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env()?;
    config.validate()?;
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let mut config = load_config(config_path)?;

    match command {
        AppCommand::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        AppCommand::Fetch => fetch(&config).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    info!("Crypto price relay starting...");
    let provider = providers::from_config(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    server::serve(listener, provider).await
}

async fn fetch(config: &AppConfig) -> Result<()> {
    let provider = providers::from_config(config)?;

    match provider.fetch_prices().await {
        Ok(prices) => {
            println!("{}", serde_json::to_string_pretty(&prices)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ErrorResult::from(&e))?);
            Err(e).context("Price fetch failed")
        }
    }
}
