//! # Proxy Module
//!
//! This module provides the HTTP entry layer and the request forwarder for
//! the token-relay proxy.
//!
//! ## Features
//!
//! - **Request forwarding**: relays inbound requests to the configured
//!   upstream service, streaming bodies in both directions
//! - **Token injection**: attaches the cached access token and expiry as
//!   provider-prefixed headers on every forwarded request
//! - **Protected paths**: requests under the configured path prefix require
//!   a valid cached token, obtained on demand via the authorization-code
//!   exchange
//! - **Header transparency**: inbound and upstream response headers pass
//!   through verbatim, except for a small documented exclusion set
//!
//! ## Error Handling
//!
//! Failures are values of [`ProxyError`] returned up to the handlers and
//! mapped to status codes there; a failed exchange or an unreachable
//! upstream never takes the process down:
//! - missing authorization code on a protected path (401)
//! - failed token exchange (502)
//! - upstream transport failure (502, with the transport error text)

pub mod forwarder;
pub mod handlers;
pub mod router;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Failure modes of the relay, mapped to HTTP statuses at the entry layer
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no authorization code available for protected path")]
    Unauthorized,
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::ExchangeFailed(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
