//! Mock identity provider for development and testing.
//!
//! Serves a minimal OAuth 2.0 token endpoint that accepts the
//! `authorization_code` grant as a form-encoded POST and answers with a JSON
//! token body in the provider's wire format (`expires_in` as a string). Run
//! next to the relay via the `start-mock-idp` CLI command.

use axum::{
    Form, Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct TokenRequest {
    code: String,
    grant_type: String,
    client_id: String,
    #[allow(dead_code)]
    client_secret: String,
    #[allow(dead_code)]
    redirect_uri: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    scope: String,
    token_type: String,
    expires_in: String,
}

// Token endpoint: validates the grant shape, then hands out a random token
async fn token_endpoint(Form(request): Form<TokenRequest>) -> (StatusCode, Json<TokenResponse>) {
    info!(
        grant_type = %request.grant_type,
        client_id = %request.client_id,
        "Mock IdP - token request received"
    );

    if request.grant_type != "authorization_code" {
        return (
            StatusCode::BAD_REQUEST,
            Json(TokenResponse {
                access_token: String::new(),
                refresh_token: String::new(),
                scope: String::new(),
                token_type: "bearer".to_string(),
                expires_in: "0".to_string(),
            }),
        );
    }

    if request.code.is_empty() || request.client_id.is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(TokenResponse {
                access_token: String::new(),
                refresh_token: String::new(),
                scope: String::new(),
                token_type: "bearer".to_string(),
                expires_in: "0".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(TokenResponse {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            scope: "all".to_string(),
            token_type: "bearer".to_string(),
            expires_in: "3600".to_string(),
        }),
    )
}

// A simple info endpoint to check the server is up
async fn info_endpoint() -> &'static str {
    "Tokengate Mock Identity Provider"
}

/// Spawn the mock identity provider on the given port
pub async fn spawn_idp_test_server(port: u16) -> (SocketAddr, oneshot::Sender<()>) {
    let app = Router::new()
        .route("/oauth2/v1/token", post(token_endpoint))
        .route("/oauth/info", get(info_endpoint));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    info!("Mock IdP running on http://{}", addr);

    let server = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(async {
        shutdown_rx.await.ok();
    });

    tokio::spawn(async move {
        if let Err(err) = server.await {
            tracing::error!("Mock IdP error: {}", err);
        }
        info!("Mock IdP shutdown");
    });

    (addr, shutdown_tx)
}
