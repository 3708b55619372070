//! Core configuration.
//!
//! Deserialized from TOML with every field defaulted, so a config file
//! only names what it changes:
//!
//! ```toml
//! [audit]
//! batch_size = 200
//! flush_interval_secs = 2
//!
//! [consent]
//! cache_ttl_secs = 60
//! ```
//!
//! Layers merge section-wise: a later layer's section replaces the
//! earlier one's.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audit pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Maximum entries per batch write.
    pub batch_size: usize,
    /// Background flush interval in seconds.
    pub flush_interval_secs: u64,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval_secs: 5,
        }
    }
}

impl AuditSettings {
    /// Flush interval as a [`Duration`].
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

/// Consent resolution tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentSettings {
    /// Per-patient cache TTL in seconds.
    pub cache_ttl_secs: u64,
    /// Maximum consents fetched per resolution.
    pub fetch_limit: usize,
}

impl Default for ConsentSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            fetch_limit: 10,
        }
    }
}

impl ConsentSettings {
    /// Cache TTL as a [`Duration`].
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Top-level configuration for the compliance core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Audit pipeline settings.
    pub audit: AuditSettings,
    /// Consent resolution settings.
    pub consent: ConsentSettings,
}

impl CoreConfig {
    /// Parses a TOML document; missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Merges a later layer into this one, section-wise: the later
    /// layer's sections win.
    pub fn merge(&mut self, other: Self) {
        self.audit = other.audit;
        self.consent = other.consent;
    }
}
