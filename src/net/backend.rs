use async_trait::async_trait;

use crate::error::FetchError;

/// A request descriptor routed through the cache.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }

    /// Normalized cache key: method + full URL.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A response produced by a network fetch (or replayed from cache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The transport seam. Implementations must treat every request uniformly
/// regardless of target; strategies own all caching decisions.
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, FetchError>;
}

/// Backend for offline mode: every fetch fails immediately, so strategies
/// fall through to their cache paths.
pub struct OfflineBackend;

#[async_trait]
impl NetworkBackend for OfflineBackend {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, FetchError> {
        Err(FetchError::NetworkFailure(format!(
            "offline mode: refusing to fetch {}",
            request.url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_includes_method_and_url() {
        let request = Request::get("https://example.com/a?x=1");
        assert_eq!(request.cache_key(), "GET https://example.com/a?x=1");
    }

    #[tokio::test]
    async fn test_offline_backend_always_fails() {
        let result = OfflineBackend.fetch(&Request::get("https://example.com/")).await;
        assert!(matches!(result, Err(FetchError::NetworkFailure(_))));
    }
}
