//! End-to-end tests for the trust-gate endpoints: fingerprint
//! registration, the session-gated relay, and the secret-gated notify
//! target. The relay tests run against a real upstream bound to a random
//! local port.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    routing::post,
};
use axum_test::TestServer;
use serde_json::{Value, json};

use fpgate_core::StaticSecretSource;
use fpgate_server::{AppState, Config, create_router};

const SESSION_SECRET: &str = "integration-session-secret";
const RELAY_SECRET: &str = "integration-relay-secret";
const LOCAL_ORIGIN: &str = "http://localhost:3000";
const FINGERPRINT: &str = "abcdefghij";

fn test_config(base_url: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        base_url: base_url.trim_end_matches('/').to_string(),
        public_origin: None,
        extra_allowed_origins: Vec::new(),
        relay_api_secret: Some(RELAY_SECRET.to_string()),
        telegram_bot_token: None,
        telegram_chat_id: None,
        telegram_api_base: "https://api.telegram.org".to_string(),
        relay_timeout: Duration::from_secs(5),
    }
}

fn gate_server(base_url: &str) -> TestServer {
    let state = AppState::with_secret_source(
        test_config(base_url),
        Arc::new(StaticSecretSource::new(SESSION_SECRET)),
    )
    .expect("state should build");

    // Real HTTP transport so the Host header is a bound 127.0.0.1:port,
    // keeping the localhost-host fallback out of the origin assertions.
    TestServer::builder()
        .http_transport()
        .save_cookies()
        .build(create_router(state))
        .expect("server should build")
}

/// Serve `router` on an ephemeral local port, returning its base URL.
async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve upstream");
    });
    format!("http://{addr}")
}

fn json_upstream() -> Router {
    Router::new().route(
        "/api/notify",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let secret = headers
                .get("x-secret-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!({ "success": true, "secret": secret, "echo": body }))
        }),
    )
}

fn html_upstream() -> Router {
    Router::new().route(
        "/api/notify",
        post(|| async {
            (
                [(header::CONTENT_TYPE, "text/html")],
                "<html><body>Something went sideways</body></html>",
            )
        }),
    )
}

async fn register(server: &TestServer, fingerprint: &str) -> axum_test::TestResponse {
    server
        .post("/api/fingerprint/register")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .json(&json!({ "fingerprint": fingerprint }))
        .await
}

#[tokio::test]
async fn health_is_ok() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = server.get("/health").await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn register_sets_session_cookie() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = register(&server, FINGERPRINT).await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie should be set")
        .to_string();
    assert!(set_cookie.starts_with("fp_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=600"));
    // Plain-HTTP localhost deployment: no Secure flag.
    assert!(!set_cookie.contains("Secure"));

    let token = response.cookie("fp_session");
    let parts: Vec<&str> = token.value().split('.').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], FINGERPRINT);
}

#[tokio::test]
async fn register_rejects_short_fingerprint() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = register(&server, "short").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Invalid fingerprint"));
}

#[tokio::test]
async fn register_treats_malformed_body_as_missing_fingerprint() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = server
        .post("/api/fingerprint/register")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .text("this is not json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Invalid fingerprint"));
}

#[tokio::test]
async fn register_rejects_disallowed_origin() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = server
        .post("/api/fingerprint/register")
        .add_header(
            header::ORIGIN,
            HeaderValue::from_static("https://attacker.example"),
        )
        .json(&json!({ "fingerprint": FINGERPRINT }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Forbidden"));
}

#[tokio::test]
async fn relay_rejects_session_less_requests() {
    let upstream = spawn_upstream(json_upstream()).await;
    let server = gate_server(&upstream);

    // No registration beforehand, so no session cookie exists.
    let response = server
        .post("/api/third-party/relay")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .json(&json!({ "fingerprint": FINGERPRINT, "number": "+201234567890" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn relay_rejects_cookie_bound_to_another_fingerprint() {
    let upstream = spawn_upstream(json_upstream()).await;
    let server = gate_server(&upstream);

    register(&server, FINGERPRINT).await.assert_status(StatusCode::OK);

    // Valid cookie, but the submitted fingerprint is not the one bound.
    let response = server
        .post("/api/third-party/relay")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .json(&json!({ "fingerprint": "zyxwvutsrq", "number": "+201234567890" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn relay_requires_a_contact_number() {
    let upstream = spawn_upstream(json_upstream()).await;
    let server = gate_server(&upstream);

    register(&server, FINGERPRINT).await.assert_status(StatusCode::OK);

    let response = server
        .post("/api/third-party/relay")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .json(&json!({ "fingerprint": FINGERPRINT }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Invalid payload"));
}

#[tokio::test]
async fn relay_forwards_with_injected_secret() {
    let upstream = spawn_upstream(json_upstream()).await;
    let server = gate_server(&upstream);

    register(&server, FINGERPRINT).await.assert_status(StatusCode::OK);

    let response = server
        .post("/api/third-party/relay")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .json(&json!({
            "fingerprint": FINGERPRINT,
            "number": "+201234567890",
            "name": "Nour",
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    // The shared secret was injected server-side, not by the caller.
    assert_eq!(body["secret"], json!(RELAY_SECRET));
    assert_eq!(body["echo"]["number"], json!("+201234567890"));
}

#[tokio::test]
async fn relay_maps_non_json_upstream_to_bad_gateway() {
    let upstream = spawn_upstream(html_upstream()).await;
    let server = gate_server(&upstream);

    register(&server, FINGERPRINT).await.assert_status(StatusCode::OK);

    let response = server
        .post("/api/third-party/relay")
        .add_header(header::ORIGIN, HeaderValue::from_static(LOCAL_ORIGIN))
        .json(&json!({ "fingerprint": FINGERPRINT, "number": "+201234567890" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Upstream returned non-JSON response"));
    assert!(
        body["raw"]
            .as_str()
            .expect("raw preview present")
            .starts_with("<html>")
    );
}

#[tokio::test]
async fn notify_rejects_bad_shared_secret() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = server
        .post("/api/notify")
        .add_header(
            header::HeaderName::from_static("x-secret-key"),
            HeaderValue::from_static("wrong-secret"),
        )
        .json(&json!({ "number": "+201234567890" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notify_without_telegram_config_is_not_configured() {
    let server = gate_server(LOCAL_ORIGIN);
    let response = server
        .post("/api/notify")
        .add_header(
            header::HeaderName::from_static("x-secret-key"),
            HeaderValue::from_static(RELAY_SECRET),
        )
        .json(&json!({ "number": "+201234567890" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Server not configured"));
}
