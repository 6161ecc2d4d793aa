//! Durable cache storage.
//!
//! This module provides the storage half of the cache router: entries
//! ([`CacheEntry`]), bounded insertion-ordered namespaces ([`Namespace`]),
//! and the [`CacheManager`] that owns every namespace for the life of the
//! process. Namespaces are persisted as one JSON file per cache name and
//! reloaded at startup, so cached responses survive restarts.

pub mod entry;
pub mod manager;
pub mod namespace;

pub use entry::CacheEntry;
pub use manager::{CacheManager, NamespaceStats};
pub use namespace::{Expiration, Namespace};
