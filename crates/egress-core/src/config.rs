//! Global configuration for the egress policy subsystem.
//!
//! Configuration is an explicit value handed to components at construction
//! time. It can be populated from environment variables.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Settings shared by every egress component.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct EgressConfig {
    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
    /// Whether policy writes are audited through the tracing sink.
    #[builder(default = true)]
    pub audit_to_log: bool,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            audit_to_log: true,
        }
    }
}

impl EgressConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LOG_LEVEL` | `info` |
    /// | `EGRESS_AUDIT_TO_LOG` | `true` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source, such as the process
    /// environment.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            config.log_level = v;
        }
        if let Some(v) = lookup("EGRESS_AUDIT_TO_LOG") {
            config.audit_to_log = v == "1" || v.eq_ignore_ascii_case("true");
        }

        config
    }
}
