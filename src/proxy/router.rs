//! # Router Module
//!
//! Builds the axum router for the token-relay proxy. Specific entry-layer
//! routes are registered first, then a catch-all per-path route feeds the
//! request forwarder. The whole router runs behind an HTTP tracing layer.

use axum::{
    Router,
    routing::{any, get},
};
use tower_http::trace::TraceLayer;

use super::handlers::{handle_auth_user, handle_proxy_request, handle_redirect};
use crate::AppState;

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth-user", get(handle_auth_user))
        .route("/redirect", get(handle_redirect))
        .route("/health", get(|| async { "OK" }))
        .route("/{*path}", any(handle_proxy_request))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
