//! Bucket-policy updater configuration.
//!
//! Lease length and acquisition attempts belong to the lock manager's
//! [`egress_lock::LockConfig`]; this only covers what the updater itself
//! decides.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::document::POLICY_VERSION;

/// Settings for [`crate::BucketPolicyUpdater`].
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Prefix of the per-bucket lock id, `"<prefix>:<bucket>"`.
    #[builder(default = String::from("bucket-policy"))]
    pub lock_id_prefix: String,

    /// `Version` written into documents that lack one.
    #[builder(default = String::from(POLICY_VERSION))]
    pub policy_version: String,

    /// Whether later audit sinks still run after one fails.
    #[builder(default = true)]
    pub continue_audit_on_error: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            lock_id_prefix: String::from("bucket-policy"),
            policy_version: String::from(POLICY_VERSION),
            continue_audit_on_error: true,
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `EGRESS_POLICY_LOCK_PREFIX` | `bucket-policy` |
    /// | `EGRESS_AUDIT_CONTINUE_ON_ERROR` | `true` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source, such as the process
    /// environment.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("EGRESS_POLICY_LOCK_PREFIX").filter(|v| !v.is_empty()) {
            config.lock_id_prefix = v;
        }
        if let Some(v) = lookup("EGRESS_AUDIT_CONTINUE_ON_ERROR") {
            config.continue_audit_on_error = v == "1" || v.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Lock id guarding `bucket`'s policy.
    #[must_use]
    pub fn lock_id(&self, bucket: &str) -> String {
        lock_id_for_bucket(&self.lock_id_prefix, bucket)
    }
}

/// `"<prefix>:<bucket>"`.
#[must_use]
pub fn lock_id_for_bucket(prefix: &str, bucket: &str) -> String {
    format!("{prefix}:{bucket}")
}
