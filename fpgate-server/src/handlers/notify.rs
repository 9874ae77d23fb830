use axum::{Json, extract::State, http::HeaderMap};
use constant_time_eq::constant_time_eq;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::{
    errors::{AppError, AppResult},
    handlers::lenient_json,
    state::AppState,
};

/// `POST /api/notify`
///
/// Internal order-notification target the relay forwards to. Callers must
/// present the shared `x-secret-key` header, which browsers going through
/// the public relay cannot set themselves. Renders the order into a plain
/// text message and posts it to the Telegram bot API.
pub async fn notify_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Json<Value>> {
    let Some(expected) = state.config.relay_api_secret.as_deref() else {
        error!("notify secret missing");
        return Err(AppError::not_configured());
    };
    let authorized = headers
        .get("x-secret-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| {
            provided.len() == expected.len()
                && constant_time_eq(provided.as_bytes(), expected.as_bytes())
        });
    if !authorized {
        warn!("notify blocked: bad or missing secret header");
        return Err(AppError::forbidden("Forbidden"));
    }

    let (Some(bot_token), Some(chat_id)) = (
        state.config.telegram_bot_token.as_deref(),
        state.config.telegram_chat_id.as_deref(),
    ) else {
        error!("telegram configuration missing");
        return Err(AppError::not_configured());
    };

    let body = lenient_json(&body);
    let text = render_order_message(&body);

    let url = format!(
        "{}/bot{}/sendMessage",
        state.config.telegram_api_base, bot_token
    );
    let response = state
        .http
        .post(&url)
        .json(&json!({ "chat_id": chat_id, "text": text }))
        .send()
        .await
        .map_err(|err| {
            error!(error = %err, "telegram request failed");
            AppError::internal(err.to_string())
        })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let raw = response.text().await.unwrap_or_default();
        error!(status, "telegram rejected the notification");
        return Err(AppError::bad_gateway(
            "Notification upstream failed",
            Some(status),
            &raw,
        ));
    }

    Ok(Json(json!({ "success": true })))
}

fn render_order_message(order: &Value) -> String {
    let field = |name: &str| {
        order.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    let mut lines = vec!["New order received".to_string()];
    for (label, name) in [
        ("Name", "name"),
        ("Number", "number"),
        ("Email", "email"),
        ("Message", "message"),
    ] {
        if let Some(value) = field(name) {
            lines.push(format!("{label}: {value}"));
        }
    }
    lines.join("\n")
}
