//! Conditional-write lock storage.
//!
//! [`LockStore`] is the seam to whatever table holds lock records. The
//! contract is a single-item compare-and-swap: a put succeeds only if no
//! record exists for the id or the existing record's lease has run out.
//! [`InMemoryLockStore`] implements it with the `DashMap` entry API, which
//! holds the shard lock for the whole check-and-insert.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A persisted lock lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    /// Lock id, the record's primary key.
    pub id: String,
    /// Random identity of the holder that wrote this record.
    pub holder: String,
    /// Absolute expiry in epoch seconds.
    pub expires_at: i64,
}

impl LockRecord {
    /// Whether the lease has run out at `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a conditional put.
///
/// A failed condition is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalWriteResult {
    /// The record was written; the caller now holds the lock.
    Written,
    /// A live record already exists.
    AlreadyHeld {
        /// Expiry of the record that blocked the write.
        expires_at: i64,
    },
}

impl ConditionalWriteResult {
    /// Whether the write took effect.
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Storage backend for lock records.
#[async_trait]
pub trait LockStore: Send + Sync + std::fmt::Debug {
    /// Write `record` unless a live record (one with `now < expires_at`)
    /// already exists for `record.id`.
    ///
    /// # Errors
    /// Returns an error only for storage faults, never for contention.
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: i64,
    ) -> anyhow::Result<ConditionalWriteResult>;

    /// Delete the record for `id` if it is still owned by `holder`.
    ///
    /// A missing record, or one that has since been taken over by another
    /// holder, is not an error. Returns whether a record was deleted.
    ///
    /// # Errors
    /// Returns an error only for storage faults.
    async fn delete_if_held(&self, id: &str, holder: &str) -> anyhow::Result<bool>;
}

/// Lock table kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    records: DashMap<String, LockRecord>,
}

impl InMemoryLockStore {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `id`, live or expired.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<LockRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Number of stored records, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: i64,
    ) -> anyhow::Result<ConditionalWriteResult> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(mut e) => {
                if e.get().is_expired(now) {
                    debug!(lock_id = %record.id, stale_expires_at = e.get().expires_at, "reclaiming expired lock");
                    e.insert(record.clone());
                    Ok(ConditionalWriteResult::Written)
                } else {
                    Ok(ConditionalWriteResult::AlreadyHeld {
                        expires_at: e.get().expires_at,
                    })
                }
            }
            Entry::Vacant(e) => {
                e.insert(record.clone());
                Ok(ConditionalWriteResult::Written)
            }
        }
    }

    async fn delete_if_held(&self, id: &str, holder: &str) -> anyhow::Result<bool> {
        Ok(self
            .records
            .remove_if(id, |_, record| record.holder == holder)
            .is_some())
    }
}
