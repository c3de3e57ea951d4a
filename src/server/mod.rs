//! Server module for the Tokengate token-relay proxy.
//!
//! This module contains the core server functionality: building the shared
//! application state, standard startup with ctrl-c handling, graceful
//! shutdown support, and a combined mode that also runs the mock identity
//! provider for local development.
//!
//! # Features
//!
//! - **Standard Server**: startup with ctrl-c triggered graceful shutdown
//! - **Graceful Shutdown**: oneshot-driven variant for embedding in tests
//!   and the combined dev mode
//! - **Cache Cleanup**: background sweep of expired token cache entries on
//!   the configured interval
//! - **Mock IdP Mode**: runs the mock identity provider next to the relay

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::AppState;
use crate::cache::TokenCache;
use crate::env::AppConfig;
use crate::proxy::forwarder::Forwarder;
use crate::proxy::router::create_router;

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Build the shared application state from validated configuration
pub fn build_state(config: AppConfig) -> Result<AppState, String> {
    let config = Arc::new(config);
    let token_cache = Arc::new(TokenCache::new(config.cache_ttl_secs));

    // One client for the whole process, carrying the default timeout for
    // both the token exchange and forwarded requests
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.client_timeout_secs))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let forwarder = Forwarder::new(config.clone(), token_cache.clone(), http_client.clone())
        .map_err(|e| format!("Invalid header prefix '{}': {}", config.header_prefix, e))?;

    Ok(AppState {
        config,
        token_cache,
        forwarder: Arc::new(forwarder),
        http_client,
    })
}

/// Start the relay with ctrl-c triggered graceful shutdown
pub async fn start_server(config: AppConfig) {
    let state = match build_state(config) {
        Ok(state) => state,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    start_cache_cleanup(&state);

    let bind_address = state.config.bind_address;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    info!("Tokengate running on http://{}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        info!("Tokengate shutting down...");
    });

    if let Err(err) = server.await {
        error!("Tokengate server error: {}", err);
    }
    info!("Tokengate shutdown complete");
}

/// Start the relay with an externally driven shutdown signal
pub async fn start_server_with_shutdown(
    config: AppConfig,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let state = match build_state(config) {
        Ok(state) => state,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    start_cache_cleanup(&state);

    let bind_address = state.config.bind_address;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    info!("Tokengate running on http://{}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_rx.await.ok();
        info!("Tokengate shutting down...");
    });

    if let Err(err) = server.await {
        error!("Tokengate server error: {}", err);
    }
    info!("Tokengate shutdown complete");
}

/// Start the mock identity provider and the relay together, used for local
/// development against a fake provider
pub async fn start_mock_idp_server(config: AppConfig, idp_port: u16) {
    let (_addr, idp_shutdown_tx) = crate::idp_test_server::spawn_idp_test_server(idp_port).await;

    let (server_shutdown_tx, server_shutdown_rx) = tokio::sync::oneshot::channel();

    let server_handle = tokio::spawn(async move {
        start_server_with_shutdown(config, server_shutdown_rx).await;
    });

    info!("Both servers are running. Press Ctrl+C to shutdown...");
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, stopping servers...");

            let _ = idp_shutdown_tx.send(());
            let _ = server_shutdown_tx.send(());

            let _ = server_handle.await;

            info!("All servers shutdown complete");
        }
        Err(err) => {
            error!("Failed to listen for shutdown signal: {}", err);
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                      Private Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Spawn the periodic token cache cleanup sweep
fn start_cache_cleanup(state: &AppState) {
    let cache = state.token_cache.clone();
    let interval_secs = state.config.cache_cleanup_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick fires immediately, skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            cache.cleanup().await;
        }
    });
}
