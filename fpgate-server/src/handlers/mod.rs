pub mod notify;
pub mod register;
pub mod relay;

use axum::http::{HeaderMap, header::HeaderName};
use serde_json::{Map, Value};

/// Parse a request body leniently: malformed JSON degrades to an empty
/// object so validation of individual fields decides the response, not the
/// JSON parser.
pub(crate) fn lenient_json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

pub(crate) fn header_str<'a>(
    headers: &'a HeaderMap,
    name: HeaderName,
) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
