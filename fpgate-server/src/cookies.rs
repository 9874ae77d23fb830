use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

/// Render the session cookie. Always `HttpOnly; SameSite=Strict; Path=/`
/// with `Max-Age` and `Expires` aligned to the token TTL; `Secure` is added
/// when the effective request went over HTTPS to a non-local host.
pub fn session_cookie(
    name: &str,
    token: &str,
    max_age: Duration,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> String {
    let mut cookie = format!(
        "{name}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}; Expires={}",
        max_age.as_secs(),
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull a single cookie value out of the `Cookie` request header.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if key == name => {
                    Some(value.to_string())
                }
                _ => None,
            }
        })
}

/// Whether the request effectively arrived over HTTPS to a host where a
/// `Secure` cookie makes sense. Localhost, `.local` hosts, and bare IPv4
/// literals are treated as development targets and skip the flag so the
/// cookie still round-trips over plain HTTP there.
pub fn is_secure_request(headers: &HeaderMap, base_url: &str) -> bool {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let hostname = host.split(':').next().unwrap_or_default();

    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let is_ip_literal = hostname.parse::<std::net::Ipv4Addr>().is_ok();
    let is_local_host = hostname == "localhost"
        || hostname.ends_with(".local")
        || is_ip_literal;

    !is_local_host
        && (forwarded_proto == "https" || base_url.starts_with("https://"))
}
