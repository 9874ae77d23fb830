use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Default lifetime of a minted session token.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "fp_session";

type HmacSha256 = Hmac<Sha256>;

/// Provider of the HMAC signing secret.
///
/// The secret is fetched on every mint/verify call rather than cached, so
/// rotating it takes effect on the next request. Tokens signed under the
/// old secret stop verifying at that point, which is the intended
/// behaviour, not a bug.
pub trait SecretSource: Send + Sync {
    /// The current secret, or `None` when the deployment has none
    /// configured. Empty values count as unconfigured.
    fn current(&self) -> Option<Zeroizing<Vec<u8>>>;
}

/// Reads the secret from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvSecretSource {
    var: String,
}

impl EnvSecretSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretSource for EnvSecretSource {
    fn current(&self) -> Option<Zeroizing<Vec<u8>>> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => {
                Some(Zeroizing::new(value.into_bytes()))
            }
            _ => None,
        }
    }
}

/// Fixed secret, for tests and setups without rotation.
#[derive(Clone)]
pub struct StaticSecretSource {
    secret: Arc<Zeroizing<Vec<u8>>>,
}

impl std::fmt::Debug for StaticSecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecretSource").finish_non_exhaustive()
    }
}

impl StaticSecretSource {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::new(Zeroizing::new(secret.as_ref().to_vec())),
        }
    }
}

impl SecretSource for StaticSecretSource {
    fn current(&self) -> Option<Zeroizing<Vec<u8>>> {
        if self.secret.is_empty() {
            None
        } else {
            Some(Zeroizing::new(self.secret.to_vec()))
        }
    }
}

/// A freshly minted session token and its absolute expiry.
#[derive(Debug, Clone)]
pub struct MintedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies signed, time-bounded bindings between a fingerprint
/// and its registration instant.
///
/// Token format: `fingerprint.issuedAtEpochMillis.hexHmacSha256Signature`,
/// where the signature covers `fingerprint.issuedAtEpochMillis` under the
/// configured secret.
#[derive(Clone)]
pub struct SessionTokenCodec {
    secrets: Arc<dyn SecretSource>,
}

impl std::fmt::Debug for SessionTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenCodec").finish_non_exhaustive()
    }
}

impl SessionTokenCodec {
    pub fn new(secrets: Arc<dyn SecretSource>) -> Self {
        Self { secrets }
    }

    /// Mint a token binding `fingerprint` to the current instant. Returns
    /// `None` when no signing secret is configured.
    pub fn mint(&self, fingerprint: &str, ttl: Duration) -> Option<MintedSession> {
        self.mint_at(fingerprint, ttl, Utc::now().timestamp_millis())
    }

    fn mint_at(
        &self,
        fingerprint: &str,
        ttl: Duration,
        issued_at_ms: i64,
    ) -> Option<MintedSession> {
        let secret = self.secrets.current()?;
        let payload = format!("{fingerprint}.{issued_at_ms}");
        let signature = hex::encode(sign(&secret, &payload));
        let expires_at_ms = issued_at_ms.saturating_add(ttl.as_millis() as i64);

        Some(MintedSession {
            token: format!("{payload}.{signature}"),
            expires_at: Utc
                .timestamp_millis_opt(expires_at_ms)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }

    /// Verify that `token` binds `fingerprint` within the last `ttl`.
    ///
    /// Fails closed: any malformed part, fingerprint mismatch, expired
    /// timestamp, missing secret, or signature mismatch yields `false`.
    /// Signature comparison is constant-time.
    pub fn verify(&self, fingerprint: &str, token: &str, ttl: Duration) -> bool {
        self.verify_at(fingerprint, token, ttl, Utc::now().timestamp_millis())
    }

    fn verify_at(
        &self,
        fingerprint: &str,
        token: &str,
        ttl: Duration,
        now_ms: i64,
    ) -> bool {
        let parts: Vec<&str> = token.split('.').collect();
        let [token_fp, token_issued, token_sig] = parts.as_slice() else {
            return false;
        };
        if token_fp.is_empty() || token_issued.is_empty() || token_sig.is_empty() {
            return false;
        }
        if *token_fp != fingerprint {
            return false;
        }

        let Ok(issued_at_ms) = token_issued.parse::<i64>() else {
            return false;
        };
        if now_ms.saturating_sub(issued_at_ms) > ttl.as_millis() as i64 {
            return false;
        }

        let Some(secret) = self.secrets.current() else {
            return false;
        };
        let Ok(provided) = hex::decode(token_sig) else {
            return false;
        };
        let expected = sign(&secret, &format!("{token_fp}.{issued_at_ms}"));
        provided.len() == expected.len() && constant_time_eq(&provided, &expected)
    }
}

fn sign(secret: &[u8], payload: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("HMAC-SHA-256 accepts keys of any size");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    fn codec() -> SessionTokenCodec {
        SessionTokenCodec::new(Arc::new(StaticSecretSource::new("topsecret")))
    }

    #[test]
    fn minted_token_verifies_immediately() {
        let codec = codec();
        let session = codec.mint("abcdefghij", TTL).unwrap();
        assert!(codec.verify("abcdefghij", &session.token, TTL));
    }

    #[test]
    fn token_is_bound_to_its_fingerprint() {
        let codec = codec();
        let session = codec.mint("abcdefghij", TTL).unwrap();
        assert!(!codec.verify("klmnopqrst", &session.token, TTL));
    }

    #[test]
    fn token_expires_after_ttl() {
        let codec = codec();
        let issued = 1_700_000_000_000;
        let session = codec.mint_at("abcdefghij", TTL, issued).unwrap();

        let ttl_ms = TTL.as_millis() as i64;
        assert!(codec.verify_at("abcdefghij", &session.token, TTL, issued + ttl_ms));
        assert!(!codec.verify_at(
            "abcdefghij",
            &session.token,
            TTL,
            issued + ttl_ms + 1
        ));
    }

    #[test]
    fn expiry_instant_matches_issue_plus_ttl() {
        let codec = codec();
        let issued = 1_700_000_000_000;
        let session = codec.mint_at("abcdefghij", TTL, issued).unwrap();
        assert_eq!(
            session.expires_at.timestamp_millis(),
            issued + TTL.as_millis() as i64
        );
    }

    #[test]
    fn tampered_signature_fails() {
        let codec = codec();
        let session = codec.mint("abcdefghij", TTL).unwrap();

        let mut tampered = session.token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(!codec.verify("abcdefghij", &tampered, TTL));
    }

    #[test]
    fn malformed_tokens_fail_closed() {
        let codec = codec();
        for token in [
            "",
            "abcdefghij",
            "abcdefghij.123",
            "abcdefghij.123.deadbeef.extra",
            "abcdefghij..deadbeef",
            ".123.deadbeef",
            "abcdefghij.123.",
            "abcdefghij.notanumber.deadbeef",
            "abcdefghij.123.not-hex!",
        ] {
            assert!(!codec.verify("abcdefghij", token, TTL), "token: {token:?}");
        }
    }

    #[test]
    fn missing_secret_disables_minting_and_verification() {
        let codec =
            SessionTokenCodec::new(Arc::new(StaticSecretSource::new("")));
        assert!(codec.mint("abcdefghij", TTL).is_none());

        let session = self::codec().mint("abcdefghij", TTL).unwrap();
        assert!(!codec.verify("abcdefghij", &session.token, TTL));
    }

    #[test]
    fn rotated_secret_invalidates_old_tokens() {
        let old = codec();
        let new = SessionTokenCodec::new(Arc::new(StaticSecretSource::new(
            "rotated-secret",
        )));
        let session = old.mint("abcdefghij", TTL).unwrap();
        assert!(!new.verify("abcdefghij", &session.token, TTL));
    }

    #[test]
    fn env_source_treats_empty_as_unconfigured() {
        // SAFETY: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("FPGATE_TEST_EMPTY_SECRET", "") };
        let source = EnvSecretSource::new("FPGATE_TEST_EMPTY_SECRET");
        assert!(source.current().is_none());

        unsafe { std::env::set_var("FPGATE_TEST_EMPTY_SECRET", "value") };
        assert_eq!(
            source.current().map(|s| s.to_vec()),
            Some(b"value".to_vec())
        );
    }
}
