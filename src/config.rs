//! Rules file handling.
//!
//! The routing configuration is an ordered list of rules loaded from
//! `~/.config/netstash/rules.json` (overridable via the `NETSTASH_RULES`
//! environment variable). A missing file falls back to a built-in rule set;
//! a malformed one fails startup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rules::RuleConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "netstash";

/// Rules file name
const RULES_FILE: &str = "rules.json";

/// Environment variable overriding the rules file location
const RULES_ENV: &str = "NETSTASH_RULES";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rules: Vec<RuleConfig>,
}

impl Config {
    /// Load the rules file, falling back to the built-in defaults when no
    /// file exists at the resolved location.
    pub fn load() -> Result<Self> {
        let path = Self::rules_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No rules file, using built-in defaults");
            Ok(Self::default_rules())
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))
    }

    fn rules_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(RULES_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(RULES_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Built-in rule set: long-lived image cache, short-lived API cache with
    /// a network timeout, and a stale-while-revalidate catch-all for pages.
    pub fn default_rules() -> Self {
        Self {
            rules: vec![
                RuleConfig {
                    pattern: r"\.(?:png|jpe?g|gif|webp|svg|ico)$".to_string(),
                    strategy: "CacheFirst".to_string(),
                    cache_name: "images".to_string(),
                    max_entries: 100,
                    max_age_seconds: 30 * 86400,
                    network_timeout_seconds: None,
                },
                RuleConfig {
                    pattern: "/api/".to_string(),
                    strategy: "NetworkFirst".to_string(),
                    cache_name: "api".to_string(),
                    max_entries: 50,
                    max_age_seconds: 3600,
                    network_timeout_seconds: Some(10),
                },
                RuleConfig {
                    pattern: "^https?://".to_string(),
                    strategy: "StaleWhileRevalidate".to_string(),
                    cache_name: "pages".to_string(),
                    max_entries: 50,
                    max_age_seconds: 86400,
                    network_timeout_seconds: None,
                },
            ],
        }
    }
}
