use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cached response, keyed by normalized request identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized request identity: method + full URL
    pub key: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            status,
            headers,
            body,
            stored_at: Utc::now(),
        }
    }

    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.stored_at).num_seconds()
    }

    /// Whether this entry is older than the namespace age limit.
    /// A limit of 0 means entries never expire by age.
    pub fn is_expired(&self, max_age_seconds: u64) -> bool {
        if max_age_seconds == 0 {
            return false;
        }
        self.age_seconds() > max_age_seconds as i64
    }

    /// Humanized age for status output ("just now", "5m ago", "2h ago")
    pub fn age_display(&self) -> String {
        let secs = self.age_seconds();
        if secs < 60 {
            // Covers clock skew (negative ages) as well
            "just now".to_string()
        } else if secs < 3600 {
            format!("{}m ago", secs / 60)
        } else if secs < 86400 {
            let hours = secs / 3600;
            if secs % 3600 >= 1800 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            format!("{}d ago", secs / 86400)
        }
    }
}
