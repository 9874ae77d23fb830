use url::Url;

/// Allow-list of web origins permitted to call the gated endpoints.
///
/// Comparison is by parsed URL origin equality, never by prefix matching,
/// so `https://shop.example` does not admit `https://shop.example.evil.tld`.
/// Entries that are not themselves valid URLs (bare `host:port` strings)
/// fall back to substring containment within the candidate's origin.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn entries(&self) -> &[String] {
        &self.allowed
    }

    /// Whether `candidate` (an `Origin` or `Referer` header value) points at
    /// an allow-listed origin. Unparseable candidates are denied.
    pub fn matches_origin(&self, candidate: &str) -> bool {
        let Ok(parsed) = Url::parse(candidate) else {
            return false;
        };
        let candidate_origin = parsed.origin().ascii_serialization();

        self.allowed.iter().any(|entry| match Url::parse(entry) {
            Ok(allowed) => {
                allowed.origin().ascii_serialization() == candidate_origin
            }
            // Bare host:port entry without a scheme.
            Err(_) => candidate_origin.contains(entry.as_str()),
        })
    }

    /// Decide whether a request may proceed, given its `Origin`, `Referer`,
    /// and `Host` headers.
    ///
    /// Checks run in order: an allow-listed `Origin` wins, then an
    /// allow-listed `Referer`. With neither matching (absent, unparseable,
    /// or pointing elsewhere) the request is only let through when the
    /// `Host` header names localhost, so local development keeps working
    /// without extra configuration.
    pub fn is_allowed_request(
        &self,
        origin: Option<&str>,
        referer: Option<&str>,
        host: Option<&str>,
    ) -> bool {
        if let Some(origin) = origin
            && !origin.is_empty()
            && self.matches_origin(origin)
        {
            return true;
        }

        if let Some(referer) = referer
            && !referer.is_empty()
            && self.matches_origin(referer)
        {
            return true;
        }

        host.is_some_and(|host| host.contains("localhost"))
    }
}
