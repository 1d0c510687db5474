//! Policy error types.
//!
//! The document and reconciliation errors are raised by pure code and never
//! caught there. [`UpdaterError`] is the only place collaborator faults are
//! classified.

use egress_core::BucketName;
use egress_lock::LockError;

/// A bucket-policy JSON document that does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum PolicyDocumentError {
    /// The text is not valid JSON.
    #[error("policy is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The top-level value is not a JSON object.
    #[error("policy document is not a JSON object")]
    NotAnObject,

    /// `Statement` is neither an object nor an array.
    #[error("policy Statement must be an object or an array")]
    InvalidStatementList,

    /// An entry in `Statement` is not an object.
    #[error("policy Statement[{index}] is not a JSON object")]
    InvalidStatement {
        /// Position of the bad entry.
        index: usize,
    },
}

/// Invariant violations detected while merging statements.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A template produced a Sid that is not `<Kind>:<resourceId>` for the
    /// grant being applied.
    #[error("template Sid {sid:?} is not a managed statement for resource {resource_id:?}")]
    UnmanagedTemplate {
        /// The template's Sid.
        sid: String,
        /// The grant's resource id.
        resource_id: String,
    },

    /// A managed statement names its principal in a form other than an AWS
    /// account list (for example `"Principal": "*"`).
    #[error("statement {sid:?} does not have an AWS account principal list")]
    UnsupportedPrincipal {
        /// Sid of the offending statement.
        sid: String,
    },
}

/// Failures of a grant or revoke call.
#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    /// The bucket-policy lock could not be obtained in time.
    #[error("bucket policy lock unavailable")]
    LockUnavailable(#[source] LockError),

    /// The lock store failed or the lock request was invalid.
    #[error("bucket policy lock failed")]
    LockStore(#[source] LockError),

    /// Reading the current policy failed.
    #[error("failed to fetch policy for bucket {bucket}")]
    PolicyFetchFailed {
        /// Target bucket.
        bucket: BucketName,
        /// Underlying fault.
        #[source]
        source: anyhow::Error,
    },

    /// Writing the revised policy failed. The bucket's policy state is
    /// unknown and the change must be treated as not applied.
    #[error("failed to write policy for bucket {bucket}")]
    PolicyWriteFailed {
        /// Target bucket.
        bucket: BucketName,
        /// Underlying fault.
        #[source]
        source: anyhow::Error,
    },

    /// The current policy could not be parsed.
    #[error("policy for bucket {bucket} is malformed")]
    MalformedPolicyDocument {
        /// Target bucket.
        bucket: BucketName,
        /// Parse failure.
        #[source]
        source: PolicyDocumentError,
    },

    /// Reconciliation hit an invariant violation.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl From<LockError> for UpdaterError {
    fn from(e: LockError) -> Self {
        if e.is_contention() {
            Self::LockUnavailable(e)
        } else {
            Self::LockStore(e)
        }
    }
}

impl UpdaterError {
    /// Message safe to return to the end user.
    pub const BUSY_MESSAGE: &str =
        "The bucket policy is being updated by another request. Please try again later.";

    /// Generic message for failures whose detail stays server-side.
    pub const INTERNAL_MESSAGE: &str = "An internal error occurred while updating bucket access.";

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockStore(e) => !matches!(e, LockError::ZeroLease { .. }),
            Self::LockUnavailable(_)
            | Self::PolicyFetchFailed { .. }
            | Self::PolicyWriteFailed { .. } => true,
            Self::MalformedPolicyDocument { .. } | Self::Reconcile(_) => false,
        }
    }

    /// Whether the error detail may be shown to the end user.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::LockUnavailable(_))
    }

    /// A message suitable for the end user.
    #[must_use]
    pub fn safe_message(&self) -> &'static str {
        if self.is_safe() {
            Self::BUSY_MESSAGE
        } else {
            Self::INTERNAL_MESSAGE
        }
    }
}
