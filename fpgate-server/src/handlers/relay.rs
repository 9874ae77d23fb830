use axum::{
    Json,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{HOST, ORIGIN, REFERER},
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error, warn};

use fpgate_core::{
    DEFAULT_FINGERPRINT_TTL, DEFAULT_SESSION_TTL, FingerprintStore,
    SESSION_COOKIE,
};

use crate::{
    cookies::extract_cookie,
    errors::{AppError, AppResult},
    handlers::{header_str, lenient_json},
    state::AppState,
};

/// `POST /api/third-party/relay`
///
/// Gate, then forward: origin allow-list, signed session cookie bound to
/// the submitted fingerprint, minimal payload shape, then a single
/// forwarding call to the internal notification endpoint with the shared
/// secret injected. The upstream response is relayed as-is when it is
/// JSON; anything else becomes a 502 with a truncated preview. No retries,
/// so a failed relay never duplicates a notification.
pub async fn relay_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Response> {
    let Some(api_secret) = state.config.relay_api_secret.clone() else {
        error!("relay API secret missing");
        return Err(AppError::not_configured());
    };
    let base_url = state.config.base_url.clone();
    if base_url.is_empty() {
        error!("relay base URL missing");
        return Err(AppError::not_configured());
    }

    let policy = state.config.origin_policy();
    if !policy.is_allowed_request(
        header_str(&headers, ORIGIN),
        header_str(&headers, REFERER),
        header_str(&headers, HOST),
    ) {
        warn!(
            origin = header_str(&headers, ORIGIN),
            referer = header_str(&headers, REFERER),
            host = header_str(&headers, HOST),
            "relay blocked: unauthorized origin"
        );
        return Err(AppError::forbidden("Forbidden: Invalid Origin"));
    }

    let body = lenient_json(&body);

    let fingerprint = body
        .get("fingerprint")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let session_ok = extract_cookie(&headers, SESSION_COOKIE)
        .is_some_and(|token| {
            state
                .sessions
                .verify(fingerprint, &token, DEFAULT_SESSION_TTL)
        });
    if fingerprint.is_empty() || !session_ok {
        warn!("relay blocked: fingerprint session did not verify");
        return Err(AppError::forbidden("Forbidden"));
    }
    if !state.registry.is_trusted(fingerprint) {
        // Valid session but the in-memory registry lost the entry, e.g.
        // after a restart. The signed cookie is the stronger proof.
        debug!("re-admitting session-verified fingerprint to registry");
        state
            .registry
            .register(fingerprint, DEFAULT_FINGERPRINT_TTL);
    }

    if !has_contact_number(&body) {
        return Err(AppError::bad_request("Invalid payload"));
    }

    let target = format!("{base_url}/api/notify");
    let upstream = state
        .http
        .post(&target)
        .header("x-secret-key", &api_secret)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            error!(error = %err, url = %target, "relay forward failed");
            AppError::internal(err.to_string())
        })?;

    let upstream_status = upstream.status().as_u16();
    let content_type = upstream
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = upstream.text().await.map_err(|err| {
        error!(error = %err, "failed to read upstream relay response");
        AppError::internal(err.to_string())
    })?;

    if !content_type.contains("application/json") {
        error!(
            status = upstream_status,
            content_type, "upstream returned non-JSON response"
        );
        return Err(AppError::bad_gateway(
            "Upstream returned non-JSON response",
            Some(upstream_status),
            &text,
        ));
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(data) => {
            let status = StatusCode::from_u16(upstream_status)
                .unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((status, Json(data)).into_response())
        }
        Err(err) => {
            error!(error = %err, "failed to parse JSON from upstream");
            Err(AppError::bad_gateway(
                "Invalid JSON from upstream",
                Some(upstream_status),
                &text,
            ))
        }
    }
}

/// The order payload must at least carry a usable contact number.
fn has_contact_number(body: &Value) -> bool {
    match body.get("number") {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        _ => false,
    }
}
