//! Trust-gate primitives for the fpgate service.
//!
//! Three leaf components with no HTTP awareness:
//!
//! - [`origin`]: allow-list based request origin validation.
//! - [`registry`]: process-wide set of trusted fingerprints with TTL expiry.
//! - [`session`]: HMAC-SHA-256 session tokens binding a fingerprint to its
//!   registration instant.
//!
//! The server crate composes these into the registration and relay
//! endpoints; keeping them here keeps the crypto and trust decisions
//! testable without a running server.

pub mod origin;
pub mod registry;
pub mod session;

pub use origin::OriginPolicy;
pub use registry::{
    DEFAULT_FINGERPRINT_TTL, FingerprintError, FingerprintStore,
    InMemoryFingerprintRegistry, MIN_FINGERPRINT_LEN, validate_fingerprint,
};
pub use session::{
    DEFAULT_SESSION_TTL, EnvSecretSource, MintedSession, SESSION_COOKIE,
    SecretSource, SessionTokenCodec, StaticSecretSource,
};
