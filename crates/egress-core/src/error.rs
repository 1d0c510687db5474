//! Error types for the egress core.

/// Core error type for identifier validation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Invalid AWS account ID.
    #[error("invalid AWS account ID: {0:?} (must be non-empty and free of ':', '/' and whitespace)")]
    InvalidAccountId(String),

    /// Invalid S3 bucket name.
    #[error("invalid bucket name: {name:?}: {reason}")]
    InvalidBucketName {
        /// The rejected bucket name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
