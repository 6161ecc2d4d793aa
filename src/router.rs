//! Request dispatch.
//!
//! The [`CacheRouter`] is the single entry point for outgoing requests. It
//! resolves a rule for each request, dispatches to the bound strategy, and
//! otherwise passes the request straight to the network. The router itself
//! is stateless between requests; all cache state lives in the manager.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::cache::CacheManager;
use crate::error::FetchError;
use crate::net::{FetchedResponse, NetworkBackend, Request};
use crate::rules::{RuleSet, Strategy};
use crate::strategy::{self, CacheStatus};

/// A resolved response together with the path that produced it.
#[derive(Debug)]
pub struct Routed {
    pub response: FetchedResponse,
    pub status: CacheStatus,
}

pub struct CacheRouter {
    rules: RuleSet,
    cache: Arc<CacheManager>,
    backend: Arc<dyn NetworkBackend>,
}

impl CacheRouter {
    pub fn new(rules: RuleSet, cache: Arc<CacheManager>, backend: Arc<dyn NetworkBackend>) -> Self {
        Self { rules, cache, backend }
    }

    /// Route one request. No matching rule means a plain network fetch with
    /// no caching side effects at all.
    pub async fn handle(&self, request: &Request) -> Result<Routed, FetchError> {
        let Some(rule) = self.rules.match_request(&request.url) else {
            debug!(url = %request.url, "No cache rule matched, passing through");
            let response = self.backend.fetch(request).await?;
            return Ok(Routed { response, status: CacheStatus::Bypass });
        };

        debug!(
            url = %request.url,
            cache = %rule.cache_name,
            strategy = ?rule.strategy,
            "Dispatching to cache strategy"
        );

        let (response, status) = match rule.strategy {
            Strategy::NetworkFirst => {
                strategy::network_first(&self.backend, &self.cache, rule, request).await?
            }
            Strategy::CacheFirst => {
                strategy::cache_first(&self.backend, &self.cache, rule, request).await?
            }
            Strategy::StaleWhileRevalidate => {
                strategy::stale_while_revalidate(&self.backend, &self.cache, rule, request).await?
            }
        };

        Ok(Routed { response, status })
    }

    /// Join outstanding revalidations and flush all namespaces.
    pub async fn shutdown(&self) -> Result<()> {
        self.cache.shutdown().await
    }
}
