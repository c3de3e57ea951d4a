//! # Request Forwarder
//!
//! The forwarder relays an inbound request to the configured upstream
//! service with the cached access token attached. For each request, in
//! order:
//!
//! 1. An inbound `<prefix>-auth-code` header, if present, is stored in the
//!    token cache (last-write-wins, supports re-authentication)
//! 2. On a protected path, a valid access token is ensured in the cache,
//!    running the authorization-code exchange at most once; a missing code
//!    fails the request as unauthorized before any outbound call
//! 3. Inbound headers are copied verbatim per the pass-through policy below
//! 4. The cached access token and expiry, when present, are injected as
//!    `<prefix>-access-token` / `<prefix>-expires-in` headers on every path
//! 5. The request body is streamed to the upstream, unbuffered, exactly once
//! 6. The upstream status, headers and body are streamed back verbatim
//!
//! ## Header pass-through policy
//!
//! The proxy is deliberately header-transparent: every inbound header is
//! forwarded and every upstream response header is returned, with these
//! exceptions, listed in [`NON_FORWARDED_HEADERS`]:
//!
//! - `host` and `content-length` are managed by the outbound HTTP client
//! - the two injected token headers are overridden from the cache

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{HeaderName, HeaderValue, InvalidHeaderName};
use axum::response::Response;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::oauth::exchange_auth_code;
use crate::cache::{ACCESS_TOKEN_KEY, AUTH_CODE_KEY, EXPIRES_IN_KEY, TokenCache};
use crate::env::AppConfig;
use crate::proxy::ProxyError;

/// Inbound headers never copied to the outbound request
pub const NON_FORWARDED_HEADERS: [&str; 2] = ["host", "content-length"];

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Relays inbound requests to the upstream service with token injection
pub struct Forwarder {
    config: Arc<AppConfig>,
    cache: Arc<TokenCache>,
    client: reqwest::Client,
    auth_code_header: HeaderName,
    access_token_header: HeaderName,
    expires_in_header: HeaderName,
}

impl Forwarder {
    /// Create a forwarder; fails if the configured header prefix does not
    /// produce valid header names
    pub fn new(
        config: Arc<AppConfig>,
        cache: Arc<TokenCache>,
        client: reqwest::Client,
    ) -> Result<Self, InvalidHeaderName> {
        let auth_code_header =
            HeaderName::try_from(format!("{}-auth-code", config.header_prefix))?;
        let access_token_header =
            HeaderName::try_from(format!("{}-access-token", config.header_prefix))?;
        let expires_in_header =
            HeaderName::try_from(format!("{}-expires-in", config.header_prefix))?;
        Ok(Self {
            config,
            cache,
            client,
            auth_code_header,
            access_token_header,
            expires_in_header,
        })
    }

    /// Header carrying the authorization code on inbound requests
    pub fn auth_code_header(&self) -> &HeaderName {
        &self.auth_code_header
    }

    /// Header carrying the injected access token
    pub fn access_token_header(&self) -> &HeaderName {
        &self.access_token_header
    }

    /// Header carrying the injected token expiry
    pub fn expires_in_header(&self) -> &HeaderName {
        &self.expires_in_header
    }

    /// Relay one request to the upstream service
    pub async fn forward(&self, req: Request) -> Result<Response, ProxyError> {
        let (parts, body) = req.into_parts();
        let request_id = Uuid::new_v4();
        let path = parts.uri.path().to_string();

        info!(
            request_id = %request_id,
            method = %parts.method,
            path = %path,
            "Forwarding request"
        );

        // Store an inbound authorization code before anything else so a
        // re-authentication attempt always lands
        if let Some(code) = parts
            .headers
            .get(&self.auth_code_header)
            .and_then(|v| v.to_str().ok())
        {
            debug!(request_id = %request_id, "Storing inbound authorization code");
            self.cache.set(AUTH_CODE_KEY, code.to_string()).await;
        }

        if self.is_protected(&path) {
            self.ensure_access_token(request_id).await?;
        }

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(path.as_str());
        let url = format!(
            "{}{}",
            self.config.upstream_url.trim_end_matches('/'),
            path_and_query
        );

        // Verbatim header copy, minus the client-managed set
        let mut headers = parts.headers.clone();
        for name in NON_FORWARDED_HEADERS {
            headers.remove(name);
        }

        // Inject the cached token on every path, protected or not
        if let Some(token) = self.cache.get(ACCESS_TOKEN_KEY).await {
            let value = HeaderValue::from_str(&token).map_err(|_| {
                ProxyError::ExchangeFailed(
                    "cached access token is not a valid header value".to_string(),
                )
            })?;
            headers.insert(self.access_token_header.clone(), value);
        }
        if let Some(expires_in) = self.cache.get(EXPIRES_IN_KEY).await {
            if let Ok(value) = HeaderValue::from_str(&expires_in) {
                headers.insert(self.expires_in_header.clone(), value);
            }
        }

        let mut builder = self
            .client
            .request(parts.method.clone(), &url)
            .headers(headers);

        // The body is handed over as a stream, consumed exactly once
        if has_request_body(&parts.headers) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_response = builder.send().await.map_err(|e| {
            error!(
                request_id = %request_id,
                upstream = %self.config.upstream_url,
                error = %e,
                "Upstream request failed"
            );
            ProxyError::UpstreamUnavailable(e.to_string())
        })?;

        let status = upstream_response.status();
        let response_headers = upstream_response.headers().clone();

        info!(
            request_id = %request_id,
            response_status = status.as_u16(),
            "Upstream responded"
        );

        let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }

    ///////////////////////////////////////////////////////////////////////////
    //****                    Private Functions                          ****//
    ///////////////////////////////////////////////////////////////////////////

    /// Protected paths are matched by prefix against the configured pattern
    fn is_protected(&self, path: &str) -> bool {
        path.starts_with(&self.config.protected_path)
    }

    /// Make sure a non-empty access token is cached, exchanging the stored
    /// authorization code at most once
    async fn ensure_access_token(&self, request_id: Uuid) -> Result<(), ProxyError> {
        if let Some(token) = self.cache.get(ACCESS_TOKEN_KEY).await {
            if !token.is_empty() {
                debug!(request_id = %request_id, "Using cached access token");
                return Ok(());
            }
        }

        let code = match self.cache.get(AUTH_CODE_KEY).await {
            Some(code) => code,
            None => {
                warn!(
                    request_id = %request_id,
                    "Protected path with no cached token and no authorization code"
                );
                return Err(ProxyError::Unauthorized);
            }
        };

        let record = exchange_auth_code(
            &self.client,
            &self.config.token_url,
            &self.config.client_id,
            &self.config.client_secret,
            &self.config.redirect_uri,
            &code,
        )
        .await
        .map_err(|e| {
            error!(request_id = %request_id, error = %e, "Token exchange failed");
            ProxyError::ExchangeFailed(e.to_string())
        })?;

        info!(
            request_id = %request_id,
            expires_in = %record.expires_in,
            obtained_at = ?record.obtained_at,
            "Caching access token from exchange"
        );
        self.cache.set(ACCESS_TOKEN_KEY, record.access_token).await;
        self.cache.set(EXPIRES_IN_KEY, record.expires_in).await;
        Ok(())
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                      Private Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// An inbound request carries a body when the framing headers say so
fn has_request_body(headers: &axum::http::HeaderMap) -> bool {
    if headers.contains_key(axum::http::header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}
