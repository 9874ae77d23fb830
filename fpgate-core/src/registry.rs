use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tracing::trace;

/// Default lifetime of a fingerprint registration.
pub const DEFAULT_FINGERPRINT_TTL: Duration = Duration::from_secs(10 * 60);

/// Minimum length accepted for a client-supplied fingerprint.
pub const MIN_FINGERPRINT_LEN: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint must be a string of at least {MIN_FINGERPRINT_LEN} characters")]
    TooShort,
}

/// Boundary check for client-supplied fingerprints. The value is opaque;
/// only non-emptiness and a minimum length are enforced.
pub fn validate_fingerprint(candidate: &str) -> Result<&str, FingerprintError> {
    if candidate.len() >= MIN_FINGERPRINT_LEN {
        Ok(candidate)
    } else {
        Err(FingerprintError::TooShort)
    }
}

/// Store of currently-trusted fingerprints.
///
/// The gate is a lightweight anti-automation heuristic, not an
/// authorization-of-record mechanism, so implementations are free to keep
/// membership purely in process memory. Abstracting the store lets tests
/// substitute their own and leaves the door open to a shared cache in a
/// multi-instance deployment.
pub trait FingerprintStore: Send + Sync {
    /// Mark `fingerprint` as trusted for the next `ttl`. Re-registering
    /// extends the window; a fingerprint registered within the last TTL is
    /// always present.
    fn register(&self, fingerprint: &str, ttl: Duration);

    fn is_trusted(&self, fingerprint: &str) -> bool;

    fn evict(&self, fingerprint: &str);
}

/// Process-wide in-memory registry with per-entry expiry.
///
/// Expired entries are dropped lazily on lookup; [`purge_expired`] exists
/// for a periodic background sweep so abandoned fingerprints do not
/// accumulate between lookups.
///
/// [`purge_expired`]: InMemoryFingerprintRegistry::purge_expired
#[derive(Debug, Default)]
pub struct InMemoryFingerprintRegistry {
    entries: DashMap<String, Instant>,
}

impl InMemoryFingerprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry whose deadline has passed. Returns how many were
    /// removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, deadline| *deadline > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            trace!(removed, "purged expired fingerprints");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FingerprintStore for InMemoryFingerprintRegistry {
    fn register(&self, fingerprint: &str, ttl: Duration) {
        let deadline = Instant::now() + ttl;
        self.entries.insert(fingerprint.to_string(), deadline);
    }

    fn is_trusted(&self, fingerprint: &str) -> bool {
        let now = Instant::now();
        let live = self
            .entries
            .get(fingerprint)
            .is_some_and(|deadline| *deadline > now);
        if !live {
            // Lazy eviction keeps lookups O(1) without a timer per entry.
            self.entries
                .remove_if(fingerprint, |_, deadline| *deadline <= now);
        }
        live
    }

    fn evict(&self, fingerprint: &str) {
        self.entries.remove(fingerprint);
    }
}
