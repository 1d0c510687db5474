//! Lock acquisition, release, and scoped critical sections.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, warn};

use egress_core::Clock;

use crate::config::LockConfig;
use crate::error::{LockError, LockResult};
use crate::store::{ConditionalWriteResult, LockRecord, LockStore};

/// Proof of a successful `obtain`, needed to release the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    id: String,
    holder: String,
    expires_at: i64,
}

impl LockToken {
    /// The lock id this token holds.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute lease expiry in epoch seconds.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

/// Obtains and releases leased locks through a [`LockStore`].
#[derive(Debug, Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    config: LockConfig,
}

impl LockManager {
    /// Create a manager over `store`, reading time from `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>, config: LockConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// The configuration this manager was built with.
    #[must_use]
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Make a single attempt to take the lock `id` for `expires_in_secs`.
    ///
    /// Returns `Ok(None)` when another live lock holds `id`.
    ///
    /// # Errors
    /// Returns [`LockError::ZeroLease`] if `expires_in_secs` is zero, or
    /// [`LockError::Store`] if the store fails.
    pub async fn obtain(&self, id: &str, expires_in_secs: u64) -> LockResult<Option<LockToken>> {
        if expires_in_secs == 0 {
            return Err(LockError::ZeroLease { id: id.to_owned() });
        }
        let now = self.clock.now_epoch_secs();
        let ttl = i64::try_from(expires_in_secs).unwrap_or(i64::MAX);
        let record = LockRecord {
            id: id.to_owned(),
            holder: uuid::Uuid::new_v4().to_string(),
            expires_at: now.saturating_add(ttl),
        };

        let result = self
            .store
            .put_if_absent_or_expired(&record, now)
            .await
            .map_err(|source| LockError::Store {
                id: id.to_owned(),
                source,
            })?;

        match result {
            ConditionalWriteResult::Written => {
                debug!(lock_id = %id, expires_at = record.expires_at, "lock obtained");
                Ok(Some(LockToken {
                    id: record.id,
                    holder: record.holder,
                    expires_at: record.expires_at,
                }))
            }
            ConditionalWriteResult::AlreadyHeld { expires_at } => {
                debug!(lock_id = %id, held_until = expires_at, "lock is held");
                Ok(None)
            }
        }
    }

    /// Release a lock previously obtained.
    ///
    /// Releasing twice, or after the lease expired and someone else took the
    /// lock, is a no-op.
    ///
    /// # Errors
    /// Returns [`LockError::Store`] if the store fails.
    pub async fn release(&self, token: &LockToken) -> LockResult<()> {
        let deleted = self
            .store
            .delete_if_held(&token.id, &token.holder)
            .await
            .map_err(|source| LockError::Store {
                id: token.id.clone(),
                source,
            })?;
        if deleted {
            debug!(lock_id = %token.id, "lock released");
        } else {
            debug!(lock_id = %token.id, "lock already released or expired");
        }
        Ok(())
    }

    /// Call [`obtain`](Self::obtain) up to `max_attempts` times, sleeping
    /// `wait` between attempts.
    ///
    /// A `max_attempts` of zero is treated as one.
    ///
    /// # Errors
    /// Returns [`LockError::LockUnavailable`] once every attempt found the
    /// lock held, or the first other error of [`obtain`](Self::obtain).
    pub async fn obtain_with_retry(
        &self,
        id: &str,
        expires_in_secs: u64,
        max_attempts: u32,
        wait: Duration,
    ) -> LockResult<LockToken> {
        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if let Some(token) = self.obtain(id, expires_in_secs).await? {
                return Ok(token);
            }
            if attempt < max_attempts {
                debug!(lock_id = %id, attempt, max_attempts, "lock busy, waiting");
                tokio::time::sleep(wait).await;
            }
        }
        warn!(lock_id = %id, attempts = max_attempts, "giving up on lock");
        Err(LockError::LockUnavailable {
            id: id.to_owned(),
            attempts: max_attempts,
        })
    }

    /// Run `f` while holding the lock `id`.
    ///
    /// The lock is released on every exit path, including a panic inside
    /// `f`, before the outcome of `f` is returned. If the lock cannot be
    /// obtained, `f` is never called.
    ///
    /// # Errors
    /// Returns the error of `f`, or a [`LockError`] converted into `E` when
    /// the lock cannot be obtained.
    pub async fn with_lock<F, Fut, T, E>(
        &self,
        id: &str,
        expires_in_secs: u64,
        max_attempts: u32,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let token = self
            .obtain_with_retry(id, expires_in_secs, max_attempts, self.config.retry_wait())
            .await?;

        let outcome = AssertUnwindSafe(f()).catch_unwind().await;

        if let Err(e) = self.release(&token).await {
            // The lease still runs out on its own.
            warn!(lock_id = %id, error = %e, "failed to release lock");
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => {
                error!(lock_id = %id, "critical section panicked");
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// [`with_lock`](Self::with_lock) using the configured lease and attempts.
    ///
    /// # Errors
    /// See [`with_lock`](Self::with_lock).
    pub async fn with_default_lock<F, Fut, T, E>(&self, id: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        self.with_lock(id, self.config.ttl_secs, self.config.max_attempts, f)
            .await
    }
}
