//! # Tokengate
//!
//! A token-relay reverse proxy: obtains a short-lived bearer token from an
//! OAuth 2.0 identity provider via the authorization-code grant, caches it in
//! memory, and injects it into requests forwarded to a single upstream
//! service.
//!
//! ## Modules
//!
//! - `cache`: in-memory expiring token cache shared by in-flight requests
//! - `auth`: OAuth 2.0 authorization-code exchange against the provider
//! - `proxy`: request forwarder, entry-layer handlers and router
//! - `server`: server startup, graceful shutdown, background cache cleanup
//! - `env`: environment variable validation and application configuration
//! - `cli`: command-line interface

use std::sync::Arc;

mod auth;
mod cache;
mod cli;
mod env;
mod idp_test_server;
mod proxy;
mod server;
#[cfg(test)]
mod tests;

use cache::TokenCache;
use env::AppConfig;
use proxy::forwarder::Forwarder;

/// Shared application state passed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_cache: Arc<TokenCache>,
    pub forwarder: Arc<Forwarder>,
    pub http_client: reqwest::Client,
}

#[tokio::main]
async fn main() {
    // TOKENGATE_LOG_LEVEL takes precedence, then RUST_LOG, then the default
    let filter = std::env::var("TOKENGATE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| env::DEFAULT_LOG_LEVEL.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    cli::run().await;
}
