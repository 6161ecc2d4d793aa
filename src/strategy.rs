//! Caching strategies.
//!
//! Each strategy resolves one request between the network backend and the
//! matched rule's storage namespace:
//!
//! - `network_first` - network bounded by the rule timeout, cache fallback
//! - `cache_first` - fresh cache read, single network fetch on miss
//! - `stale_while_revalidate` - immediate cache read, background refresh
//!
//! Strategies never hold state of their own; everything lives in the
//! [`CacheManager`] namespaces.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheManager};
use crate::error::FetchError;
use crate::net::{FetchedResponse, NetworkBackend, Request};
use crate::rules::Rule;

/// Where a routed response was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from cache, within the age limit
    Hit,
    /// Served from cache past the age limit (fallback or pending revalidation)
    Stale,
    /// Served from the network and written to cache
    Miss,
    /// No rule matched; passed through without caching
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Stale => write!(f, "STALE"),
            Self::Miss => write!(f, "MISS"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

fn entry_from_response(key: String, response: &FetchedResponse) -> CacheEntry {
    CacheEntry::new(key, response.status, response.headers.clone(), response.body.clone())
}

fn response_from_entry(entry: &CacheEntry) -> FetchedResponse {
    FetchedResponse {
        status: entry.status,
        headers: entry.headers.clone(),
        body: entry.body.clone(),
    }
}

/// Race a fetch against the rule timeout. A timeout of 0 means no bound;
/// the losing fetch is dropped with its future.
async fn fetch_with_timeout(
    backend: &dyn NetworkBackend,
    timeout_seconds: u64,
    request: &Request,
) -> Result<FetchedResponse, FetchError> {
    if timeout_seconds == 0 {
        return backend.fetch(request).await;
    }
    match tokio::time::timeout(Duration::from_secs(timeout_seconds), backend.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::NetworkTimeout(timeout_seconds)),
    }
}

/// Try the network first; on success write through to the namespace. On
/// failure or timeout fall back to any cached entry, expired or not, and
/// propagate the network error only when the cache has nothing.
pub(crate) async fn network_first(
    backend: &Arc<dyn NetworkBackend>,
    cache: &Arc<CacheManager>,
    rule: &Rule,
    request: &Request,
) -> Result<(FetchedResponse, CacheStatus), FetchError> {
    let key = request.cache_key();
    match fetch_with_timeout(backend.as_ref(), rule.network_timeout_seconds, request).await {
        Ok(response) => {
            cache.put(&rule.cache_name, entry_from_response(key, &response)).await;
            Ok((response, CacheStatus::Miss))
        }
        Err(err) => match cache.get(&rule.cache_name, &key).await {
            Some(entry) => {
                debug!(url = %request.url, error = %err, "Network failed, serving cached entry");
                let status = if entry.is_expired(rule.expiration.max_age_seconds) {
                    CacheStatus::Stale
                } else {
                    CacheStatus::Hit
                };
                Ok((response_from_entry(&entry), status))
            }
            None => Err(err),
        },
    }
}

/// Serve a fresh cached entry without touching the network; otherwise fetch
/// once, store, and return. Expired entries count as absent here.
pub(crate) async fn cache_first(
    backend: &Arc<dyn NetworkBackend>,
    cache: &Arc<CacheManager>,
    rule: &Rule,
    request: &Request,
) -> Result<(FetchedResponse, CacheStatus), FetchError> {
    let key = request.cache_key();
    if let Some(entry) = cache.get_fresh(&rule.cache_name, &key).await {
        debug!(url = %request.url, cache = %rule.cache_name, "Cache hit");
        return Ok((response_from_entry(&entry), CacheStatus::Hit));
    }

    let response = match backend.fetch(request).await {
        Ok(response) => response,
        Err(err) => {
            // An age-expired entry still pins the original network error;
            // a truly empty namespace reports the miss itself
            if cache.get(&rule.cache_name, &key).await.is_none() {
                return Err(FetchError::CacheMiss(key));
            }
            return Err(err);
        }
    };
    cache.put(&rule.cache_name, entry_from_response(key, &response)).await;
    Ok((response, CacheStatus::Miss))
}

/// Serve any cached entry immediately and refresh it in the background. The
/// revalidation fetch never blocks the caller and its failures are only
/// logged. With nothing cached this degrades to a blocking fetch.
pub(crate) async fn stale_while_revalidate(
    backend: &Arc<dyn NetworkBackend>,
    cache: &Arc<CacheManager>,
    rule: &Rule,
    request: &Request,
) -> Result<(FetchedResponse, CacheStatus), FetchError> {
    let key = request.cache_key();
    if let Some(entry) = cache.get(&rule.cache_name, &key).await {
        let status = if entry.is_expired(rule.expiration.max_age_seconds) {
            CacheStatus::Stale
        } else {
            CacheStatus::Hit
        };
        spawn_revalidation(backend, cache, rule, request).await;
        return Ok((response_from_entry(&entry), status));
    }

    // First sight of this key: nothing to serve yet, block on the network once
    let response = backend.fetch(request).await?;
    cache.put(&rule.cache_name, entry_from_response(key, &response)).await;
    Ok((response, CacheStatus::Miss))
}

async fn spawn_revalidation(
    backend: &Arc<dyn NetworkBackend>,
    cache: &Arc<CacheManager>,
    rule: &Rule,
    request: &Request,
) {
    let backend = Arc::clone(backend);
    let cache_task = Arc::clone(cache);
    let cache_name = rule.cache_name.clone();
    let request = request.clone();

    let handle = tokio::spawn(async move {
        match backend.fetch(&request).await {
            Ok(response) => {
                debug!(url = %request.url, "Revalidated cached entry");
                let entry = entry_from_response(request.cache_key(), &response);
                cache_task.put(&cache_name, entry).await;
            }
            Err(err) => {
                // The caller already has a response; failure stays here
                warn!(url = %request.url, error = %err, "Background revalidation failed");
            }
        }
    });

    cache.track_revalidation(handle).await;
}
