use axum::{
    extract::State,
    http::{
        HeaderMap,
        header::{HOST, ORIGIN, REFERER, SET_COOKIE},
    },
    response::{AppendHeaders, IntoResponse, Response},
};
use axum::Json;
use serde_json::{Value, json};
use tracing::{error, warn};

use fpgate_core::{
    DEFAULT_FINGERPRINT_TTL, DEFAULT_SESSION_TTL, FingerprintStore,
    SESSION_COOKIE, validate_fingerprint,
};

use crate::{
    cookies::{is_secure_request, session_cookie},
    errors::{AppError, AppResult},
    handlers::{header_str, lenient_json},
    state::AppState,
};

/// `POST /api/fingerprint/register`
///
/// Validates the caller's origin and fingerprint, marks the fingerprint as
/// trusted, and hands back a signed session cookie bound to it. Every step
/// is a hard gate; the first failure terminates the request.
pub async fn register_fingerprint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Response> {
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
            "fingerprint register blocked"
        );
        return Err(AppError::forbidden("Forbidden"));
    }

    let body = lenient_json(&body);
    let fingerprint = body
        .get("fingerprint")
        .and_then(Value::as_str)
        .and_then(|fp| validate_fingerprint(fp).ok())
        .ok_or_else(|| AppError::bad_request("Invalid fingerprint"))?;

    let Some(session) = state.sessions.mint(fingerprint, DEFAULT_SESSION_TTL)
    else {
        error!("fingerprint session secret missing");
        return Err(AppError::not_configured());
    };

    state
        .registry
        .register(fingerprint, DEFAULT_FINGERPRINT_TTL);

    let cookie = session_cookie(
        SESSION_COOKIE,
        &session.token,
        DEFAULT_SESSION_TTL,
        session.expires_at,
        is_secure_request(&headers, &state.config.base_url),
    );

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    )
        .into_response())
}
