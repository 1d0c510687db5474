//! Lock error types.

/// Errors surfaced by the lock manager.
///
/// Contention on a single `obtain` is not an error; it is reported as
/// `Ok(None)`. Only exhausting every attempt, a zero-length lease or a store
/// fault becomes a [`LockError`].
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Every acquisition attempt found a live lock.
    #[error("lock {id} not obtained after {attempts} attempts")]
    LockUnavailable {
        /// The contended lock id.
        id: String,
        /// How many attempts were made.
        attempts: u32,
    },

    /// A lease of zero seconds was requested. Such a record is expired as
    /// soon as it is written and excludes nobody.
    #[error("lock {id} requested with a zero-second lease")]
    ZeroLease {
        /// Lock id the request targeted.
        id: String,
    },

    /// The backing store failed.
    #[error("lock store failure for {id}")]
    Store {
        /// Lock id the operation targeted.
        id: String,
        /// Underlying fault.
        #[source]
        source: anyhow::Error,
    },
}

impl LockError {
    /// Whether the caller may reasonably try again later.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::LockUnavailable { .. })
    }
}

/// Convenience result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
