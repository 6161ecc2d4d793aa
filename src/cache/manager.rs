use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::rules::RuleSet;

use super::entry::CacheEntry;
use super::namespace::Namespace;

/// Grace period for joining outstanding revalidation tasks at shutdown.
/// Anything still running afterwards is abandoned.
const SHUTDOWN_GRACE_SECS: u64 = 5;

/// Entry count and age summary for one namespace, for status output.
#[derive(Debug)]
pub struct NamespaceStats {
    pub name: String,
    pub entries: usize,
    /// Age of the most recently stored entry, humanized. None if empty.
    pub newest_age: Option<String>,
}

/// Owner of all durable cache state.
///
/// One namespace per configured cache name, each persisted as a JSON file in
/// the cache directory and reloaded on startup. Background revalidation tasks
/// register their handles here so shutdown can join them.
pub struct CacheManager {
    cache_dir: PathBuf,
    namespaces: Mutex<HashMap<String, Namespace>>,
    revalidations: Mutex<Vec<JoinHandle<()>>>,
}

impl CacheManager {
    /// Open the cache directory and load one namespace per cache name in the
    /// rule set. Unreadable namespace files are logged and start empty rather
    /// than failing startup.
    pub fn open(cache_dir: PathBuf, rules: &RuleSet) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;

        let mut namespaces = HashMap::new();
        for (name, expiration) in rules.namespaces() {
            let ns = match Self::load_entries(&cache_dir, &name) {
                Ok(Some(entries)) => {
                    debug!(cache = %name, entries = entries.len(), "Loaded persisted namespace");
                    Namespace::from_entries(&name, expiration, entries)
                }
                Ok(None) => Namespace::new(&name, expiration),
                Err(e) => {
                    warn!(cache = %name, error = %e, "Failed to load namespace, starting empty");
                    Namespace::new(&name, expiration)
                }
            };
            namespaces.insert(name, ns);
        }

        Ok(Self {
            cache_dir,
            namespaces: Mutex::new(namespaces),
            revalidations: Mutex::new(Vec::new()),
        })
    }

    fn namespace_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.json", name))
    }

    fn load_entries(dir: &Path, name: &str) -> Result<Option<Vec<CacheEntry>>> {
        let path = Self::namespace_path(dir, name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;
        let entries: Vec<CacheEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;
        Ok(Some(entries))
    }

    fn save_namespace(&self, ns: &Namespace) -> Result<()> {
        let entries: Vec<&CacheEntry> = ns.entries().collect();
        let contents = serde_json::to_string_pretty(&entries)?;
        std::fs::write(Self::namespace_path(&self.cache_dir, ns.name()), contents)?;
        Ok(())
    }

    /// Look up an entry regardless of age (network-failure fallback reads).
    pub async fn get(&self, cache_name: &str, key: &str) -> Option<CacheEntry> {
        let map = self.namespaces.lock().await;
        map.get(cache_name).and_then(|ns| ns.get(key)).cloned()
    }

    /// Look up an entry, treating age-expired entries as absent.
    pub async fn get_fresh(&self, cache_name: &str, key: &str) -> Option<CacheEntry> {
        let map = self.namespaces.lock().await;
        map.get(cache_name).and_then(|ns| ns.get_fresh(key)).cloned()
    }

    /// Store an entry and write the namespace through to disk. Persistence
    /// failures are logged, never surfaced to the request path.
    pub async fn put(&self, cache_name: &str, entry: CacheEntry) {
        let mut map = self.namespaces.lock().await;
        match map.get_mut(cache_name) {
            Some(ns) => {
                ns.put(entry);
                if let Err(e) = self.save_namespace(ns) {
                    warn!(cache = %cache_name, error = %e, "Failed to persist namespace");
                }
            }
            None => {
                // Rules only dispatch to registered namespaces
                debug!(cache = %cache_name, "Dropping entry for unregistered namespace");
            }
        }
    }

    /// Write every namespace to disk.
    pub async fn flush(&self) -> Result<()> {
        let map = self.namespaces.lock().await;
        for ns in map.values() {
            self.save_namespace(ns)
                .with_context(|| format!("Failed to flush namespace '{}'", ns.name()))?;
        }
        Ok(())
    }

    /// Drop all cached entries and remove the namespace files.
    pub async fn purge(&self) -> Result<()> {
        let mut map = self.namespaces.lock().await;
        for ns in map.values_mut() {
            ns.clear();
            let path = Self::namespace_path(&self.cache_dir, ns.name());
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }

    /// Per-namespace entry counts and newest-entry ages, sorted by name.
    pub async fn stats(&self) -> Vec<NamespaceStats> {
        let map = self.namespaces.lock().await;
        let mut stats: Vec<NamespaceStats> = map
            .values()
            .map(|ns| NamespaceStats {
                name: ns.name().to_string(),
                entries: ns.len(),
                newest_age: ns.newest().map(|e| e.age_display()),
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Register a background revalidation task so shutdown can join it.
    pub async fn track_revalidation(&self, handle: JoinHandle<()>) {
        self.revalidations.lock().await.push(handle);
    }

    /// Wait for all currently outstanding revalidation tasks to finish.
    pub async fn join_revalidations(&self) {
        let handles: Vec<JoinHandle<()>> = self.revalidations.lock().await.drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Revalidation task panicked");
            }
        }
    }

    /// Teardown: join outstanding revalidations within the grace period, then
    /// flush every namespace to disk.
    pub async fn shutdown(&self) -> Result<()> {
        let join = self.join_revalidations();
        if tokio::time::timeout(Duration::from_secs(SHUTDOWN_GRACE_SECS), join)
            .await
            .is_err()
        {
            warn!(grace_secs = SHUTDOWN_GRACE_SECS, "Abandoning outstanding revalidation tasks");
        }
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleConfig, RuleSet};

    fn ruleset() -> RuleSet {
        RuleSet::compile(&[RuleConfig {
            pattern: ".*".to_string(),
            strategy: "CacheFirst".to_string(),
            cache_name: "pages".to_string(),
            max_entries: 3,
            max_age_seconds: 0,
            network_timeout_seconds: None,
        }])
        .expect("valid test rules")
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CacheManager::open(dir.path().to_path_buf(), &ruleset()).expect("open");

        manager
            .put("pages", CacheEntry::new("GET /a", 200, vec![], b"hello".to_vec()))
            .await;

        let entry = manager.get("pages", "GET /a").await.expect("entry");
        assert_eq!(entry.body, b"hello");
        assert!(manager.get("pages", "GET /missing").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");

        {
            let manager = CacheManager::open(dir.path().to_path_buf(), &ruleset()).expect("open");
            manager
                .put("pages", CacheEntry::new("GET /a", 200, vec![], b"persisted".to_vec()))
                .await;
        }

        let reopened = CacheManager::open(dir.path().to_path_buf(), &ruleset()).expect("reopen");
        let entry = reopened.get("pages", "GET /a").await.expect("entry");
        assert_eq!(entry.body, b"persisted");
    }

    #[tokio::test]
    async fn test_corrupt_namespace_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("pages.json"), "not json").expect("write");

        let manager = CacheManager::open(dir.path().to_path_buf(), &ruleset()).expect("open");
        assert!(manager.get("pages", "GET /a").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_removes_entries_and_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CacheManager::open(dir.path().to_path_buf(), &ruleset()).expect("open");

        manager
            .put("pages", CacheEntry::new("GET /a", 200, vec![], b"x".to_vec()))
            .await;
        assert!(dir.path().join("pages.json").exists());

        manager.purge().await.expect("purge");
        assert!(manager.get("pages", "GET /a").await.is_none());
        assert!(!dir.path().join("pages.json").exists());
    }

    #[tokio::test]
    async fn test_stats_report_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CacheManager::open(dir.path().to_path_buf(), &ruleset()).expect("open");

        let stats = manager.stats().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "pages");
        assert_eq!(stats[0].entries, 0);
        assert!(stats[0].newest_age.is_none());

        manager
            .put("pages", CacheEntry::new("GET /a", 200, vec![], b"x".to_vec()))
            .await;
        let stats = manager.stats().await;
        assert_eq!(stats[0].entries, 1);
        assert_eq!(stats[0].newest_age.as_deref(), Some("just now"));
    }
}
