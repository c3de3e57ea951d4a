//! OAuth 2.0 authorization-code exchange
//!
//! This module implements the single outbound call to the identity provider's
//! token endpoint: a form-encoded POST with the `authorization_code` grant,
//! answered by a JSON body carrying the access token. The exchanger performs
//! no retries and never touches the token cache; on success the caller stores
//! the returned [`TokenRecord`].
//!
//! Every failure mode (transport error, non-2xx status, malformed body,
//! empty token) surfaces as an [`ExchangeError`]; the forwarder collapses
//! them into its single exchange-failed category.

use std::time::Instant;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// An access token obtained from a successful exchange
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub access_token: String,
    /// Token lifetime exactly as the provider reported it
    pub expires_in: String,
    pub obtained_at: Instant,
}

/// Failure modes of the token exchange
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint returned status {0}")]
    Status(StatusCode),
    #[error("token endpoint returned no access token")]
    EmptyToken,
}

///////////////////////////////////////////////////////////////////////////////
//****                        Private Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Form body sent to the token endpoint
#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    code: &'a str,
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

/// JSON body returned by the token endpoint
#[derive(Deserialize, Debug, Default)]
struct TokenExchangeResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: String,
}

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Exchange an authorization code for an access token
pub async fn exchange_auth_code(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenRecord, ExchangeError> {
    info!("Requesting token exchange from {}", token_url);
    let request_body = TokenExchangeRequest {
        code,
        grant_type: "authorization_code",
        client_id,
        client_secret,
        redirect_uri,
    };

    // reqwest sets Content-Type: application/x-www-form-urlencoded for us
    let response = client.post(token_url).form(&request_body).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExchangeError::Status(status));
    }

    let token_response: TokenExchangeResponse = response.json().await?;
    if token_response.access_token.is_empty() {
        return Err(ExchangeError::EmptyToken);
    }

    debug!(
        token_type = %token_response.token_type,
        scope = %token_response.scope,
        expires_in = %token_response.expires_in,
        has_refresh_token = !token_response.refresh_token.is_empty(),
        "Token exchange succeeded"
    );

    Ok(TokenRecord {
        access_token: token_response.access_token,
        expires_in: token_response.expires_in,
        obtained_at: Instant::now(),
    })
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
