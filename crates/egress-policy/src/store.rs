//! Bucket-policy storage.
//!
//! [`PolicyStore`] reads and replaces a bucket's whole policy text. Writes
//! are not conditional, so callers must hold the bucket-policy lock around
//! a read-modify-write. [`InMemoryPolicyStore`] keeps one policy slot per
//! bucket, the way the S3 service state keeps `policy` on each bucket.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use egress_core::BucketName;

/// Errors from the in-memory policy store.
#[derive(Debug, thiserror::Error)]
pub enum PolicyStoreError {
    /// The specified bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },
}

/// Reader and writer of bucket policies.
#[async_trait]
pub trait PolicyStore: Send + Sync + std::fmt::Debug {
    /// Current policy text, or `None` if the bucket has no policy.
    ///
    /// # Errors
    /// Returns an error if the policy cannot be read.
    async fn get_policy(&self, bucket: &BucketName) -> anyhow::Result<Option<String>>;

    /// Replace the bucket's policy with `policy`.
    ///
    /// # Errors
    /// Returns an error if the policy cannot be written.
    async fn put_policy(&self, bucket: &BucketName, policy: &str) -> anyhow::Result<()>;

    /// Remove the bucket's policy. Removing an absent policy succeeds.
    ///
    /// # Errors
    /// Returns an error if the policy cannot be removed.
    async fn delete_policy(&self, bucket: &BucketName) -> anyhow::Result<()>;
}

/// Policy state of one bucket.
#[derive(Debug)]
struct PolicySlot {
    policy: RwLock<Option<String>>,
    updated_at: RwLock<Option<DateTime<Utc>>>,
}

impl PolicySlot {
    fn new() -> Self {
        Self {
            policy: RwLock::new(None),
            updated_at: RwLock::new(None),
        }
    }
}

/// Bucket policies kept in process memory.
///
/// Buckets must be created before their policy can be read or written.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    buckets: DashMap<String, PolicySlot>,
}

impl InMemoryPolicyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bucket with no policy. Existing buckets are left as is.
    pub fn create_bucket(&self, bucket: &BucketName) {
        self.buckets
            .entry(bucket.as_str().to_owned())
            .or_insert_with(PolicySlot::new);
    }

    /// Register a bucket with an initial policy, replacing any existing one.
    pub fn create_bucket_with_policy(&self, bucket: &BucketName, policy: impl Into<String>) {
        let slot = PolicySlot::new();
        *slot.policy.write() = Some(policy.into());
        *slot.updated_at.write() = Some(Utc::now());
        self.buckets.insert(bucket.as_str().to_owned(), slot);
    }

    /// Current policy text, without going through the async trait.
    #[must_use]
    pub fn policy(&self, bucket: &BucketName) -> Option<String> {
        self.buckets
            .get(bucket.as_str())
            .and_then(|slot| slot.policy.read().clone())
    }

    /// When the bucket's policy was last written or removed.
    #[must_use]
    pub fn updated_at(&self, bucket: &BucketName) -> Option<DateTime<Utc>> {
        self.buckets
            .get(bucket.as_str())
            .and_then(|slot| *slot.updated_at.read())
    }

    fn no_such_bucket(bucket: &BucketName) -> anyhow::Error {
        PolicyStoreError::NoSuchBucket {
            bucket: bucket.as_str().to_owned(),
        }
        .into()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get_policy(&self, bucket: &BucketName) -> anyhow::Result<Option<String>> {
        let slot = self
            .buckets
            .get(bucket.as_str())
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        let policy = slot.policy.read().clone();
        Ok(policy)
    }

    async fn put_policy(&self, bucket: &BucketName, policy: &str) -> anyhow::Result<()> {
        let slot = self
            .buckets
            .get(bucket.as_str())
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        *slot.policy.write() = Some(policy.to_owned());
        *slot.updated_at.write() = Some(Utc::now());
        debug!(bucket = %bucket, "put_bucket_policy completed");
        Ok(())
    }

    async fn delete_policy(&self, bucket: &BucketName) -> anyhow::Result<()> {
        let slot = self
            .buckets
            .get(bucket.as_str())
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        *slot.policy.write() = None;
        *slot.updated_at.write() = Some(Utc::now());
        debug!(bucket = %bucket, "delete_bucket_policy completed");
        Ok(())
    }
}
