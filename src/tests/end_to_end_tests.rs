//! End-to-end tests: full router over real sockets, against the mock
//! identity provider and a trivial upstream.

use std::net::SocketAddr;

use axum::{Router, routing::any};

use crate::AppState;
use crate::cache::{ACCESS_TOKEN_KEY, EXPIRES_IN_KEY};
use crate::env::AppConfig;
use crate::idp_test_server::spawn_idp_test_server;
use crate::proxy::router::create_router;
use crate::server;

///////////////////////////////////////////////////////////////////////////////
//****                         Test Fixtures                             ****//
///////////////////////////////////////////////////////////////////////////////

async fn spawn_upstream_echo() -> SocketAddr {
    let app = Router::new().route("/{*path}", any(|| async { "upstream says hi" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Keeps the mock IdP's shutdown channel alive for the test's duration
type IdpGuard = tokio::sync::oneshot::Sender<()>;

async fn spawn_gateway() -> (SocketAddr, AppState, IdpGuard) {
    let (idp_addr, idp_guard) = spawn_idp_test_server(0).await;
    let upstream_addr = spawn_upstream_echo().await;

    let config = AppConfig {
        token_url: format!("http://127.0.0.1:{}/oauth2/v1/token", idp_addr.port()),
        client_id: "client_id".to_string(),
        client_secret: "client_secret".to_string(),
        redirect_uri: "http://localhost:8080/redirect".to_string(),
        upstream_url: format!("http://{}", upstream_addr),
        protected_path: "/api".to_string(),
        header_prefix: "tmn".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        bind_address: "127.0.0.1:0".parse().unwrap(),
        cache_ttl_secs: 300,
        cache_cleanup_interval_secs: 600,
        client_timeout_secs: 5,
    };

    let state = server::build_state(config).unwrap();
    let app = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state, idp_guard)
}

/// Client that does not follow the login redirect
fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _state, _idp) = spawn_gateway().await;
    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_user_without_code_is_unauthorized() {
    let (addr, _state, _idp) = spawn_gateway().await;
    let response = no_redirect_client()
        .get(format!("http://{}/auth-user", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_user_exchanges_and_redirects_with_token_headers() {
    let (addr, state, _idp) = spawn_gateway().await;
    let response = no_redirect_client()
        .get(format!("http://{}/auth-user", addr))
        .header("tmn-auth-code", "abc123")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 301);
    assert_eq!(
        response.headers()["location"],
        "http://localhost:8080/redirect"
    );
    let token = response.headers()["tmn-access-token"].to_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(response.headers()["tmn-expires-in"], "3600");

    // The exchange result landed in the cache for subsequent proxying
    assert_eq!(
        state.token_cache.get(ACCESS_TOKEN_KEY).await.as_deref(),
        Some(token)
    );
    assert_eq!(
        state.token_cache.get(EXPIRES_IN_KEY).await.as_deref(),
        Some("3600")
    );
}

#[tokio::test]
async fn test_redirect_echoes_access_token_header() {
    let (addr, _state, _idp) = spawn_gateway().await;
    let response = reqwest::Client::new()
        .get(format!("http://{}/redirect", addr))
        .header("tmn-access-token", "tok9")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["access_token"], "tok9");
}

#[tokio::test]
async fn test_catch_all_proxies_to_upstream() {
    let (addr, _state, _idp) = spawn_gateway().await;
    let response = reqwest::get(format!("http://{}/public/hello", addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "upstream says hi");
}

#[tokio::test]
async fn test_protected_path_through_gateway_after_login() {
    let (addr, _state, _idp) = spawn_gateway().await;
    let client = no_redirect_client();

    // Complete a login first so the cache holds a token
    let login = client
        .get(format!("http://{}/auth-user", addr))
        .header("tmn-auth-code", "abc123")
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 301);

    let response = client
        .get(format!("http://{}/api/things", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "upstream says hi");
}

#[tokio::test]
async fn test_protected_path_through_gateway_without_login_is_unauthorized() {
    let (addr, _state, _idp) = spawn_gateway().await;
    let response = reqwest::get(format!("http://{}/api/things", addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}
