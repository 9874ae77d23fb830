use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// Terminal request failure, rendered as `{"success": false, "error": ...}`
/// with the mapped status code. Extra diagnostic fields (upstream status,
/// truncated body preview) ride along for the 502 path.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub extra: Option<Value>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            extra: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_configured() -> Self {
        Self::internal("Server not configured")
    }

    /// Upstream handed back something we could not relay as JSON. The raw
    /// body is truncated so an HTML error page cannot flood the response.
    pub fn bad_gateway(
        message: impl Into<String>,
        upstream_status: Option<u16>,
        raw: &str,
    ) -> Self {
        const PREVIEW_LIMIT: usize = 1000;
        let preview: String = raw.chars().take(PREVIEW_LIMIT).collect();
        let mut extra = serde_json::Map::new();
        if let Some(status) = upstream_status {
            extra.insert("status".into(), json!(status));
        }
        extra.insert("raw".into(), json!(preview));

        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
            extra: Some(Value::Object(extra)),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.message,
        });
        if let (Some(obj), Some(Value::Object(extra))) =
            (body.as_object_mut(), self.extra)
        {
            obj.extend(extra);
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "unhandled handler error");
        Self::internal("Server error")
    }
}
