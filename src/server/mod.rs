//! HTTP surface: `POST /run` behind API-key authentication, per-tenant rate
//! limiting and audit logging, plus an open `GET /health`.

mod audit;
mod auth;
mod error;
mod rate_limit;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tracing::info;

use crate::client::{DynCompletionClient, HttpCompletionClient};
use crate::config::{Config, validate_server};
use crate::orchestrator::Orchestrator;

pub use auth::AuthState;
pub use rate_limit::RateLimitState;

/// State shared by the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub request_timeout: Duration,
}

pub fn router(state: AppState, auth: AuthState, limits: RateLimitState) -> Router {
    // Layers added last run first: auth, then audit, then the rate limiter.
    let run = post(routes::run)
        .route_layer(from_fn_with_state(limits, rate_limit::rate_limit_middleware))
        .route_layer(from_fn(audit::audit_middleware))
        .route_layer(from_fn_with_state(auth, auth::auth_middleware));

    Router::new()
        .route("/run", run)
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Builds the application from `config` and serves it until Ctrl-C.
pub async fn serve(config: Config, bind: Option<String>) -> Result<()> {
    validate_server(&config)?;

    let client: Arc<DynCompletionClient> = Arc::new(HttpCompletionClient::new(&config)?);
    let orchestrator = Orchestrator::standard(client, &config.pipeline);
    let server = &config.server;
    let stages = orchestrator.stage_count();

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        request_timeout: Duration::from_secs(server.request_timeout_secs),
    };
    let app = router(
        state,
        AuthState::new(server.api_keys.clone()),
        RateLimitState::new(server.rate_limit_per_minute, server.rate_limit_burst),
    );

    let addr = bind.unwrap_or_else(|| server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, stages, tenants = server.api_keys.len(), model = %config.models.model, "launchpad listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("Server error")
}

#[cfg(test)]
mod tests;
