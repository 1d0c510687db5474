//! Locked read-modify-write of egress bucket policies.
//!
//! ```text
//! grant_access / revoke_access
//!        |
//!        v
//! LockManager::with_lock("bucket-policy:<bucket>")
//!        |
//!        +--> PolicyStore::get_policy
//!        +--> reconcile / revoke
//!        +--> PolicyStore::put_policy (revoke: delete_policy when empty)
//!        +--> AuditDispatcher::dispatch (failures logged only)
//! ```

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use egress_lock::LockManager;

use crate::audit::{AuditDispatcher, AuditEvent, actions};
use crate::builder::DEFAULT_TEMPLATES;
use crate::config::UpdaterConfig;
use crate::document::PolicyDocument;
use crate::error::UpdaterError;
use crate::grant::ResourceGrant;
use crate::reconcile::{merge_principal, reconcile, revoke};
use crate::store::PolicyStore;

/// Direction of a policy change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Grant,
    Revoke,
}

impl Change {
    fn action(self) -> &'static str {
        match self {
            Self::Grant => actions::GRANT_BUCKET_ACCESS,
            Self::Revoke => actions::REVOKE_BUCKET_ACCESS,
        }
    }
}

/// Applies grants and revocations to bucket policies under the
/// bucket-policy lock.
#[derive(Debug, Clone)]
pub struct BucketPolicyUpdater {
    lock: LockManager,
    store: Arc<dyn PolicyStore>,
    audit: AuditDispatcher,
    config: UpdaterConfig,
}

impl BucketPolicyUpdater {
    /// Create an updater.
    #[must_use]
    pub fn new(
        lock: LockManager,
        store: Arc<dyn PolicyStore>,
        audit: AuditDispatcher,
        config: UpdaterConfig,
    ) -> Self {
        Self {
            lock,
            store,
            audit,
            config,
        }
    }

    /// The configuration this updater was built with.
    #[must_use]
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Give the grantee the statements `grant` requires on its bucket.
    ///
    /// Returns the policy as written.
    ///
    /// # Errors
    /// Returns an [`UpdaterError`] if the lock cannot be obtained, the
    /// policy cannot be read, parsed or written, or reconciliation fails.
    /// On every error the lock has been released.
    pub async fn grant_access(&self, grant: &ResourceGrant) -> Result<PolicyDocument, UpdaterError> {
        self.update(grant, Change::Grant).await
    }

    /// Remove the grantee from every statement of the grant's resource.
    ///
    /// Returns the policy as written.
    ///
    /// # Errors
    /// See [`grant_access`](Self::grant_access).
    pub async fn revoke_access(&self, grant: &ResourceGrant) -> Result<PolicyDocument, UpdaterError> {
        self.update(grant, Change::Revoke).await
    }

    async fn update(&self, grant: &ResourceGrant, change: Change) -> Result<PolicyDocument, UpdaterError> {
        let lock_id = self.config.lock_id(grant.bucket_name.as_str());

        let result = self
            .lock
            .with_default_lock(&lock_id, || self.apply(grant, change))
            .await;

        match &result {
            Ok(_) => info!(
                bucket = %grant.bucket_name,
                resource_id = %grant.resource_id,
                account = %grant.grantee_account_id,
                action = change.action(),
                "bucket policy updated"
            ),
            Err(e) if e.is_safe() => warn!(
                bucket = %grant.bucket_name,
                action = change.action(),
                error = %e,
                "bucket policy update rejected"
            ),
            Err(e) => error!(
                bucket = %grant.bucket_name,
                action = change.action(),
                error = ?e,
                "bucket policy update failed"
            ),
        }
        result
    }

    /// The critical section. Runs only while the bucket lock is held.
    async fn apply(&self, grant: &ResourceGrant, change: Change) -> Result<PolicyDocument, UpdaterError> {
        let bucket = &grant.bucket_name;

        let raw = self
            .store
            .get_policy(bucket)
            .await
            .map_err(|source| UpdaterError::PolicyFetchFailed {
                bucket: bucket.clone(),
                source,
            })?;
        let current = match raw {
            Some(text) => PolicyDocument::parse(&text).map_err(|source| {
                UpdaterError::MalformedPolicyDocument {
                    bucket: bucket.clone(),
                    source,
                }
            })?,
            None => PolicyDocument::empty(),
        };

        let statements = match change {
            Change::Grant => reconcile(&current, grant, &DEFAULT_TEMPLATES, merge_principal)?,
            Change::Revoke => revoke(&current, grant)?,
        };
        let mut revised = current.with_statements(statements);
        revised.ensure_version(&self.config.policy_version);

        if change == Change::Revoke && revised.statements().is_empty() {
            debug!(bucket = %bucket, "no statements left, removing policy");
            self.store
                .delete_policy(bucket)
                .await
                .map_err(|source| UpdaterError::PolicyWriteFailed {
                    bucket: bucket.clone(),
                    source,
                })?;
        } else {
            let text = revised
                .to_json()
                .map_err(|e| UpdaterError::PolicyWriteFailed {
                    bucket: bucket.clone(),
                    source: e.into(),
                })?;
            self.store
                .put_policy(bucket, &text)
                .await
                .map_err(|source| UpdaterError::PolicyWriteFailed {
                    bucket: bucket.clone(),
                    source,
                })?;
        }

        self.record(grant, change, &revised).await;
        Ok(revised)
    }

    async fn record(&self, grant: &ResourceGrant, change: Change, policy: &PolicyDocument) {
        let event = AuditEvent::new(
            change.action(),
            json!({
                "bucket": grant.bucket_name.as_str(),
                "resourceId": grant.resource_id,
                "accountId": grant.grantee_account_id.as_str(),
                "read": grant.read,
                "write": grant.write,
                "policy": policy.to_value(),
            }),
        );
        for failure in self
            .audit
            .dispatch(&event, self.config.continue_audit_on_error)
            .await
        {
            warn!(sink = %failure.sink, action = %failure.action, error = ?failure.source, "audit write failed");
        }
    }
}
