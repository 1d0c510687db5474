//! Common AWS identifiers and ARN helpers.

use std::fmt;

use crate::CoreError;

/// AWS account identifier of a grantee.
///
/// Any non-empty id that can sit inside an ARN is accepted, including the
/// placeholder accounts used by staging setups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account ID from a string.
    ///
    /// # Errors
    /// Returns an error if the ID is empty or contains `:`, `/` or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let invalid = id.is_empty()
            || id
                .chars()
                .any(|c| c == ':' || c == '/' || c.is_whitespace());
        if invalid {
            return Err(CoreError::InvalidAccountId(id));
        }
        Ok(Self(id))
    }

    /// Get the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `arn:aws:iam::<id>:root` principal for this account.
    #[must_use]
    pub fn root_arn(&self) -> String {
        account_root_arn(&self.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// S3 bucket name.
///
/// Only names that cannot appear in a policy ARN are refused; the bucket
/// itself already exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Maximum bucket name length accepted by S3.
    pub const MAX_LEN: usize = 63;

    /// Create a bucket name.
    ///
    /// # Errors
    /// Returns an error if the name is empty, too long, or contains `/`,
    /// `*` or whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::InvalidBucketName {
                name,
                reason: "name is empty",
            });
        }
        if name.len() > Self::MAX_LEN {
            return Err(CoreError::InvalidBucketName {
                name,
                reason: "name is longer than 63 characters",
            });
        }
        if name
            .chars()
            .any(|c| c == '/' || c == '*' || c.is_whitespace())
        {
            return Err(CoreError::InvalidBucketName {
                name,
                reason: "name contains '/', '*' or whitespace",
            });
        }
        Ok(Self(name))
    }

    /// Get the bucket name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare `arn:aws:s3:::<bucket>` ARN.
    #[must_use]
    pub fn arn(&self) -> String {
        bucket_arn(&self.0)
    }
}

impl TryFrom<String> for BucketName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BucketName> for String {
    fn from(value: BucketName) -> Self {
        value.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root principal ARN for an account: `arn:aws:iam::<account>:root`.
#[must_use]
pub fn account_root_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{account_id}:root")
}

/// Bare bucket ARN: `arn:aws:s3:::<bucket>`.
#[must_use]
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

/// Object ARN under a key pattern: `arn:aws:s3:::<bucket>/<key_pattern>`.
#[must_use]
pub fn object_arn(bucket: &str, key_pattern: &str) -> String {
    format!("arn:aws:s3:::{bucket}/{key_pattern}")
}
