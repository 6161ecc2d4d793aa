//! Cache routing rules.
//!
//! A rule binds a URL pattern to a caching strategy, a storage namespace,
//! and that namespace's expiration settings. Rules are kept in declaration
//! order and matched by explicit iteration; the first match wins and no
//! reordering for specificity ever happens. A request matching no rule
//! bypasses caching entirely.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::Expiration;
use crate::error::ConfigError;

/// How a matched request is resolved between cache and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "NetworkFirst" => Ok(Strategy::NetworkFirst),
            "CacheFirst" => Ok(Strategy::CacheFirst),
            "StaleWhileRevalidate" => Ok(Strategy::StaleWhileRevalidate),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// On-disk rule format, as found in the rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub strategy: String,
    pub cache_name: String,
    #[serde(default)]
    pub max_entries: i64,
    #[serde(default)]
    pub max_age_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_timeout_seconds: Option<i64>,
}

/// A validated rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    pub strategy: Strategy,
    pub cache_name: String,
    pub expiration: Expiration,
    /// Bound on the NetworkFirst fetch race, in seconds. 0 = no bound.
    pub network_timeout_seconds: u64,
}

impl Rule {
    /// Whether this rule's pattern matches the full URL string.
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

fn valid_cache_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The ordered rule table. Order is exactly the declaration order of the
/// rules file and is significant.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate and compile a rule list. Any malformed rule fails here, at
    /// startup, so request handling never sees configuration errors.
    pub fn compile(configs: &[RuleConfig]) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(configs.len());
        let mut declared: HashMap<String, Expiration> = HashMap::new();

        for config in configs {
            let strategy = Strategy::parse(&config.strategy)?;

            let pattern = Regex::new(&config.pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: config.pattern.clone(),
                reason: e.to_string(),
            })?;

            if !valid_cache_name(&config.cache_name) {
                return Err(ConfigError::InvalidCacheName(config.cache_name.clone()));
            }

            if config.max_entries < 0 {
                return Err(ConfigError::NegativeValue {
                    field: "max_entries",
                    pattern: config.pattern.clone(),
                });
            }
            if config.max_age_seconds < 0 {
                return Err(ConfigError::NegativeValue {
                    field: "max_age_seconds",
                    pattern: config.pattern.clone(),
                });
            }
            let network_timeout_seconds = match config.network_timeout_seconds {
                Some(t) if t < 0 => {
                    return Err(ConfigError::NegativeValue {
                        field: "network_timeout_seconds",
                        pattern: config.pattern.clone(),
                    });
                }
                Some(t) => t as u64,
                None => 0,
            };

            if config.network_timeout_seconds.is_some() && strategy != Strategy::NetworkFirst {
                warn!(
                    pattern = %config.pattern,
                    "network_timeout_seconds is only honored by NetworkFirst rules"
                );
            }

            let expiration = Expiration::new(config.max_entries as u64, config.max_age_seconds as u64);

            // Rules may share a cache name, but the namespace settings must agree
            if let Some(existing) = declared.get(&config.cache_name) {
                if *existing != expiration {
                    return Err(ConfigError::ConflictingNamespace(config.cache_name.clone()));
                }
            } else {
                declared.insert(config.cache_name.clone(), expiration);
            }

            rules.push(Rule {
                pattern,
                strategy,
                cache_name: config.cache_name.clone(),
                expiration,
                network_timeout_seconds,
            });
        }

        Ok(Self { rules })
    }

    /// Return the first rule whose pattern matches the URL, in declaration
    /// order. Pure: no side effects, deterministic for a given rule set.
    pub fn match_request(&self, url: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(url))
    }

    /// Distinct cache names with their expiration settings, in first-seen
    /// order, for namespace registration.
    pub fn namespaces(&self) -> Vec<(String, Expiration)> {
        let mut seen = Vec::new();
        for rule in &self.rules {
            if !seen.iter().any(|(name, _)| name == &rule.cache_name) {
                seen.push((rule.cache_name.clone(), rule.expiration));
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, strategy: &str, cache_name: &str) -> RuleConfig {
        RuleConfig {
            pattern: pattern.to_string(),
            strategy: strategy.to_string(),
            cache_name: cache_name.to_string(),
            max_entries: 10,
            max_age_seconds: 60,
            network_timeout_seconds: None,
        }
    }

    #[test]
    fn test_first_match_wins_in_declaration_order() {
        let ruleset = RuleSet::compile(&[
            rule(r"\.png$", "CacheFirst", "images"),
            rule(r".*", "NetworkFirst", "pages"),
        ])
        .expect("compile");

        let matched = ruleset.match_request("https://example.com/logo.png").expect("match");
        assert_eq!(matched.cache_name, "images");
        assert_eq!(matched.strategy, Strategy::CacheFirst);

        // The catch-all picks up everything else
        let matched = ruleset.match_request("https://example.com/index.html").expect("match");
        assert_eq!(matched.cache_name, "pages");
    }

    #[test]
    fn test_no_match_returns_none() {
        let ruleset = RuleSet::compile(&[rule(r"\.png$", "CacheFirst", "images")]).expect("compile");
        assert!(ruleset.match_request("https://example.com/data.json").is_none());
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = RuleSet::compile(&[rule(".*", "CacheOnly", "pages")]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStrategy(name) if name == "CacheOnly"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = RuleSet::compile(&[rule("[unclosed", "CacheFirst", "pages")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_negative_expiration_is_rejected() {
        let mut bad = rule(".*", "CacheFirst", "pages");
        bad.max_age_seconds = -1;
        let err = RuleSet::compile(&[bad]).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeValue { field: "max_age_seconds", .. }));
    }

    #[test]
    fn test_negative_timeout_is_rejected() {
        let mut bad = rule(".*", "NetworkFirst", "pages");
        bad.network_timeout_seconds = Some(-5);
        let err = RuleSet::compile(&[bad]).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeValue { field: "network_timeout_seconds", .. }));
    }

    #[test]
    fn test_bad_cache_name_is_rejected() {
        let err = RuleSet::compile(&[rule(".*", "CacheFirst", "../escape")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCacheName(_)));
    }

    #[test]
    fn test_conflicting_namespace_settings_are_rejected() {
        let mut second = rule(r"\.jpg$", "CacheFirst", "images");
        second.max_entries = 99;
        let err = RuleSet::compile(&[rule(r"\.png$", "CacheFirst", "images"), second]).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingNamespace(name) if name == "images"));
    }

    #[test]
    fn test_shared_namespace_with_identical_settings_is_allowed() {
        let ruleset = RuleSet::compile(&[
            rule(r"\.png$", "CacheFirst", "images"),
            rule(r"\.jpg$", "CacheFirst", "images"),
        ])
        .expect("compile");
        assert_eq!(ruleset.len(), 2);
        assert_eq!(ruleset.namespaces().len(), 1);
    }
}
