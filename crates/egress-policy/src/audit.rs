//! Audit events for bucket-policy changes.
//!
//! Auditing is best effort. [`AuditDispatcher`] visits its sinks in order
//! and hands back the failures instead of raising them; the updater logs
//! those and carries on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use egress_core::EgressConfig;

/// Action names recorded for policy changes.
pub mod actions {
    /// An account was granted access to a resource prefix.
    pub const GRANT_BUCKET_ACCESS: &str = "grant-egress-bucket-access";
    /// An account's access to a resource prefix was revoked.
    pub const REVOKE_BUCKET_ACCESS: &str = "revoke-egress-bucket-access";
}

/// One audited action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// What happened.
    pub action: String,
    /// Details, including the resulting policy.
    pub body: Value,
    /// When the event was created.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(action: impl Into<String>, body: Value) -> Self {
        Self {
            action: action.into(),
            body,
            recorded_at: Utc::now(),
        }
    }
}

/// A sink failed to record an event.
#[derive(Debug, thiserror::Error)]
#[error("audit sink {sink} failed to record {action}")]
pub struct AuditWriteFailed {
    /// Name of the failing sink.
    pub sink: String,
    /// Action of the event that was not recorded.
    pub action: String,
    /// Underlying fault.
    #[source]
    pub source: anyhow::Error,
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Record one event.
    ///
    /// # Errors
    /// Returns an error if the event could not be recorded.
    async fn record_event(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// Ordered list of audit sinks.
#[derive(Debug, Clone, Default)]
pub struct AuditDispatcher {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditDispatcher {
    /// A dispatcher with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with the sinks `config` enables.
    #[must_use]
    pub fn from_config(config: &EgressConfig) -> Self {
        let dispatcher = Self::new();
        if config.audit_to_log {
            dispatcher.with_sink(Arc::new(TracingAuditSink))
        } else {
            dispatcher
        }
    }

    /// Append a sink; sinks are visited in insertion order.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Send `event` to each sink in order.
    ///
    /// With `continue_on_error` every sink is visited; otherwise the walk
    /// stops at the first failure. All failures seen are returned.
    pub async fn dispatch(
        &self,
        event: &AuditEvent,
        continue_on_error: bool,
    ) -> Vec<AuditWriteFailed> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(source) = sink.record_event(event).await {
                failures.push(AuditWriteFailed {
                    sink: sink.name().to_owned(),
                    action: event.action.clone(),
                    source,
                });
                if !continue_on_error {
                    break;
                }
            }
        }
        failures
    }
}

/// Sink that writes events to the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn record_event(&self, event: &AuditEvent) -> anyhow::Result<()> {
        info!(target: "audit", action = %event.action, body = %event.body, "audit event");
        Ok(())
    }
}

/// Sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record_event(&self, event: &AuditEvent) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
