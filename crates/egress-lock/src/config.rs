//! Lock acquisition settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Lease and retry settings for [`crate::LockManager`].
///
/// # Examples
///
/// ```
/// use egress_lock::LockConfig;
///
/// let config = LockConfig::default();
/// assert_eq!(config.ttl_secs, 25);
/// assert_eq!(config.max_attempts, 15);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct LockConfig {
    /// Lease length in seconds. Must comfortably exceed the critical section.
    #[builder(default = 25)]
    pub ttl_secs: u64,

    /// Number of acquisition attempts before giving up.
    #[builder(default = 15)]
    pub max_attempts: u32,

    /// Fixed wait between attempts, in milliseconds.
    #[builder(default = 1_000)]
    pub retry_wait_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 25,
            max_attempts: 15,
            retry_wait_ms: 1_000,
        }
    }
}

impl LockConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `EGRESS_LOCK_TTL_SECS` | `25` |
    /// | `EGRESS_LOCK_MAX_ATTEMPTS` | `15` |
    /// | `EGRESS_LOCK_RETRY_WAIT_MS` | `1000` |
    ///
    /// Unparseable values, and a TTL of zero, are ignored and the default
    /// is kept.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source, such as the process
    /// environment.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| -> Option<u64> { lookup(key).and_then(|v| v.trim().parse().ok()) };
        let mut config = Self::default();

        if let Some(n) = parse("EGRESS_LOCK_TTL_SECS").filter(|n| *n > 0) {
            config.ttl_secs = n;
        }
        if let Some(n) = parse("EGRESS_LOCK_MAX_ATTEMPTS") {
            config.max_attempts = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(n) = parse("EGRESS_LOCK_RETRY_WAIT_MS") {
            config.retry_wait_ms = n;
        }

        config
    }

    /// The wait between acquisition attempts.
    #[must_use]
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }
}
