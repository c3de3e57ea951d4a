//! # Entry-Layer Handlers
//!
//! HTTP handlers for the token-relay proxy:
//!
//! - `handle_auth_user`: browser-facing login completion. Reads the
//!   provider's authorization code from the `<prefix>-auth-code` header,
//!   stores it, runs the token exchange, caches the result, and redirects to
//!   the configured redirect URI with the token carried in response headers.
//! - `handle_redirect`: the redirect target. Echoes the inbound access-token
//!   header back as JSON so a client can pick the token up.
//! - `handle_proxy_request`: catch-all that hands the request to the
//!   forwarder and maps relay errors to status codes.
//!
//! A failed exchange answers the one request that triggered it; it never
//! terminates the process.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::auth::oauth::exchange_auth_code;
use crate::cache::{ACCESS_TOKEN_KEY, AUTH_CODE_KEY, EXPIRES_IN_KEY};
use crate::proxy::ProxyError;

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Catch-all handler feeding the request forwarder
pub async fn handle_proxy_request(State(state): State<AppState>, req: Request) -> Response {
    match state.forwarder.forward(req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Complete a login: exchange the authorization code and redirect with the
/// token set in response headers
pub async fn handle_auth_user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = Uuid::new_v4();

    let code = headers
        .get(state.forwarder.auth_code_header())
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let Some(code) = code else {
        warn!(request_id = %request_id, "Login request without authorization code header");
        return ProxyError::Unauthorized.into_response();
    };

    // Last-write-wins, a fresh login replaces the previous code
    state.token_cache.set(AUTH_CODE_KEY, code.clone()).await;

    let record = match exchange_auth_code(
        &state.http_client,
        &state.config.token_url,
        &state.config.client_id,
        &state.config.client_secret,
        &state.config.redirect_uri,
        &code,
    )
    .await
    {
        Ok(record) => record,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Login token exchange failed");
            return ProxyError::ExchangeFailed(e.to_string()).into_response();
        }
    };

    state
        .token_cache
        .set(ACCESS_TOKEN_KEY, record.access_token.clone())
        .await;
    state
        .token_cache
        .set(EXPIRES_IN_KEY, record.expires_in.clone())
        .await;

    info!(request_id = %request_id, "Login exchange complete, redirecting");

    let (Ok(location), Ok(token_value), Ok(expires_value)) = (
        HeaderValue::from_str(&state.config.redirect_uri),
        HeaderValue::from_str(&record.access_token),
        HeaderValue::from_str(&record.expires_in),
    ) else {
        error!(request_id = %request_id, "Exchange result is not header-safe");
        return ProxyError::ExchangeFailed("token is not a valid header value".to_string())
            .into_response();
    };

    let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
    response.headers_mut().insert(header::LOCATION, location);
    response
        .headers_mut()
        .insert(state.forwarder.access_token_header().clone(), token_value);
    response
        .headers_mut()
        .insert(state.forwarder.expires_in_header().clone(), expires_value);
    response
}

/// Redirect target: echo the inbound access-token header as JSON
pub async fn handle_redirect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let access_token = headers
        .get(state.forwarder.access_token_header())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    Json(json!({ "access_token": access_token })).into_response()
}
