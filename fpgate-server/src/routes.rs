use axum::{
    Json, Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    handlers::{
        notify::notify_order, register::register_fingerprint,
        relay::relay_order,
    },
    state::AppState,
};

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/health", get(health))
        .route("/api/fingerprint/register", post(register_fingerprint))
        .route("/api/third-party/relay", post(relay_order))
        .route("/api/notify", post(notify_order))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser-facing CORS policy mirroring the origin allow-list. The
/// handlers still run their own origin gate; CORS only governs what the
/// browser lets page scripts read back.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::try_from(origin.as_str()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
