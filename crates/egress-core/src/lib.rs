//! Core types, configuration, and time source for the egress policy subsystem.
//!
//! This crate provides the building blocks shared by the lock manager and the
//! bucket-policy updater: validated AWS identifiers and ARN helpers, an
//! injectable [`Clock`], global configuration, and the core error type.

mod clock;
mod config;
mod error;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EgressConfig;
pub use error::CoreError;
pub use types::{AccountId, BucketName, account_root_arn, bucket_arn, object_arn};
