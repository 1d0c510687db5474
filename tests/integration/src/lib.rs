//! Integration tests for the egress bucket-policy updater.
//!
//! These tests wire real lock managers and updaters together over the
//! in-memory stores and drive them from many tasks at once, the way several
//! API processes share one lock table and one bucket.
//!
//! Run them with:
//! ```text
//! cargo test -p egress-integration
//! ```

use std::sync::{Arc, Once};

use egress_core::{AccountId, BucketName, EgressConfig, SystemClock};
use egress_lock::{InMemoryLockStore, LockConfig, LockManager};
use egress_policy::{
    AuditDispatcher, BucketPolicyUpdater, InMemoryPolicyStore, MemoryAuditSink, ResourceGrant,
    UpdaterConfig,
};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| {
                        tracing_subscriber::EnvFilter::new(EgressConfig::from_env().log_level)
                    }),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> BucketName {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    BucketName::new(format!("test-{prefix}-{id}"))
        .unwrap_or_else(|e| panic!("invalid test bucket name: {e}"))
}

/// A twelve digit account id derived from `n`.
#[must_use]
pub fn account(n: u32) -> AccountId {
    AccountId::new(format!("{:012}", 100_000_000_000_u64 + u64::from(n)))
        .unwrap_or_else(|e| panic!("invalid test account: {e}"))
}

/// Shared lock table and bucket store, plus the audit trail of every
/// updater built from them.
#[derive(Debug)]
pub struct Harness {
    /// Lock table shared by all updaters.
    pub locks: Arc<InMemoryLockStore>,
    /// Bucket policies shared by all updaters.
    pub policies: Arc<InMemoryPolicyStore>,
    /// Events recorded by all updaters.
    pub audit: Arc<MemoryAuditSink>,
    /// Bucket under test, already created.
    pub bucket: BucketName,
}

impl Harness {
    /// Create stores and a bucket with no policy.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        init_tracing();
        let bucket = test_bucket_name(prefix);
        let policies = Arc::new(InMemoryPolicyStore::new());
        policies.create_bucket(&bucket);
        Self {
            locks: Arc::new(InMemoryLockStore::new()),
            policies,
            audit: Arc::new(MemoryAuditSink::new()),
            bucket,
        }
    }

    /// A lock manager over the shared table, as another process would have.
    #[must_use]
    pub fn lock_manager(&self) -> LockManager {
        self.lock_manager_with(LockConfig::default().max_attempts)
    }

    /// A lock manager over the shared table giving up after `max_attempts`.
    #[must_use]
    pub fn lock_manager_with(&self, max_attempts: u32) -> LockManager {
        LockManager::new(
            self.locks.clone(),
            Arc::new(SystemClock),
            LockConfig::builder()
                .max_attempts(max_attempts)
                .retry_wait_ms(5)
                .build(),
        )
    }

    /// An updater with its own lock manager over the shared stores.
    #[must_use]
    pub fn updater(&self, max_attempts: u32) -> BucketPolicyUpdater {
        BucketPolicyUpdater::new(
            self.lock_manager_with(max_attempts),
            self.policies.clone(),
            AuditDispatcher::from_config(&EgressConfig::default()).with_sink(self.audit.clone()),
            UpdaterConfig::default(),
        )
    }

    /// A grant on this harness's bucket.
    #[must_use]
    pub fn grant(&self, resource_id: &str, account: AccountId, read: bool, write: bool) -> ResourceGrant {
        ResourceGrant::builder()
            .resource_id(resource_id.to_owned())
            .bucket_name(self.bucket.clone())
            .path_prefix(format!("{resource_id}/"))
            .grantee_account_id(account)
            .read(read)
            .write(write)
            .build()
    }
}

mod test_concurrency;
mod test_lock;
