//! HTTP surface: a welcome route and the `/prices` relay.

use crate::core::price::{ErrorResult, PriceProvider};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const WELCOME: &str = "Welcome to the crypto price relay. GET /prices for current quotes.";

#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn PriceProvider>,
}

pub fn router(provider: Arc<dyn PriceProvider>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/", get(welcome))
        .route("/prices", get(prices))
        .with_state(AppState { provider })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn welcome() -> &'static str {
    WELCOME
}

async fn prices(State(state): State<AppState>) -> Response {
    match state.provider.fetch_prices().await {
        Ok(prices) => (StatusCode::OK, Json(prices)).into_response(),
        Err(e) => {
            error!(provider = state.provider.name(), error = %e, "Price fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResult::from(&e)),
            )
                .into_response()
        }
    }
}

/// Serves the relay on `listener` until Ctrl-C or SIGTERM.
pub async fn serve(listener: TcpListener, provider: Arc<dyn PriceProvider>) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(provider))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Unable to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
