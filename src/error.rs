use thiserror::Error;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors surfaced while resolving a request between network and cache.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    NetworkFailure(String),

    #[error("Network request timed out after {0}s")]
    NetworkTimeout(u64),

    #[error("No cached entry available for {0}")]
    CacheMiss(String),
}

impl FetchError {
    /// Truncate a response body to avoid dragging excessive data into messages
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!("{}... (truncated, {} total bytes)",
                    &body[..MAX_ERROR_BODY_LENGTH],
                    body.len())
        }
    }

    /// Map a non-success HTTP status into a network failure carrying the body.
    pub fn from_status(status: u16, body: &str) -> Self {
        FetchError::NetworkFailure(format!("Status {}: {}", status, Self::truncate_body(body)))
    }
}

/// Rule validation errors. All of these fail at startup, never at request time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown strategy '{0}' (expected NetworkFirst, CacheFirst, or StaleWhileRevalidate)")]
    UnknownStrategy(String),

    #[error("Invalid URL pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Negative {field} in rule '{pattern}'")]
    NegativeValue { field: &'static str, pattern: String },

    #[error("Invalid cache name '{0}' (letters, digits, '-' and '_' only)")]
    InvalidCacheName(String),

    #[error("Cache '{0}' is declared with conflicting expiration settings")]
    ConflictingNamespace(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_short_body() {
        let err = FetchError::from_status(502, "upstream unavailable");
        assert_eq!(
            err.to_string(),
            "Network request failed: Status 502: upstream unavailable"
        );
    }

    #[test]
    fn test_from_status_truncates_long_body() {
        let body = "x".repeat(2000);
        let msg = FetchError::from_status(500, &body).to_string();
        assert!(msg.contains("truncated, 2000 total bytes"));
        assert!(msg.len() < body.len());
    }
}
