//! Leased distributed write lock.
//!
//! A lock is a single record keyed by a caller-chosen id. It is taken with a
//! conditional write that only succeeds when no live record exists, and it is
//! freed either by an explicit release or by its lease running out.
//!
//! # Architecture
//!
//! ```text
//! LockManager (obtain / release / obtain_with_retry / with_lock)
//!        |
//!        v
//!   dyn LockStore (put_if_absent_or_expired / delete_if_held)
//!        |
//!        v
//!   InMemoryLockStore | any table with a conditional put
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod store;

pub use config::LockConfig;
pub use error::{LockError, LockResult};
pub use manager::{LockManager, LockToken};
pub use store::{ConditionalWriteResult, InMemoryLockStore, LockRecord, LockStore};
