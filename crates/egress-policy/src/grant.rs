//! Access grants and the statement kinds they map to.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use egress_core::{AccountId, BucketName};

/// The desired read/write access of one account to one resource's prefix
/// in an egress bucket.
///
/// # Examples
///
/// ```
/// use egress_core::{AccountId, BucketName};
/// use egress_policy::ResourceGrant;
///
/// let grant = ResourceGrant::builder()
///     .resource_id("env-42".to_owned())
///     .bucket_name(BucketName::new("egress-bucket").unwrap())
///     .path_prefix("env-42/".to_owned())
///     .grantee_account_id(AccountId::new("111122223333").unwrap())
///     .read(true)
///     .build();
/// assert!(!grant.write);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGrant {
    /// Id of the resource (egress store, environment) the prefix belongs to.
    pub resource_id: String,
    /// Bucket holding the resource's objects.
    pub bucket_name: BucketName,
    /// Key prefix the resource's objects live under.
    pub path_prefix: String,
    /// Whether the grantee may read objects.
    #[builder(default)]
    #[serde(default)]
    pub read: bool,
    /// Whether the grantee may write and delete objects.
    #[builder(default)]
    #[serde(default)]
    pub write: bool,
    /// Account receiving access.
    pub grantee_account_id: AccountId,
}

impl ResourceGrant {
    /// Statement kinds this grant requires, in Get, Put, List order.
    #[must_use]
    pub fn required_kinds(&self) -> Vec<StatementKind> {
        StatementKind::ALL
            .into_iter()
            .filter(|kind| kind.is_required_by(self))
            .collect()
    }

    /// Root ARN of the grantee.
    #[must_use]
    pub fn grantee_arn(&self) -> String {
        self.grantee_account_id.root_arn()
    }
}

/// Kind of a managed statement, the part of the Sid before `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    /// Object reads.
    Get,
    /// Object writes, deletes and multipart uploads.
    Put,
    /// Listing under the prefix.
    List,
}

impl StatementKind {
    /// Every kind, in template order.
    pub const ALL: [Self; 3] = [Self::Get, Self::Put, Self::List];

    /// The Sid prefix for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "Get",
            Self::Put => "Put",
            Self::List => "List",
        }
    }

    /// S3 actions granted by this kind.
    #[must_use]
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            Self::Get => &["s3:GetObject"],
            Self::Put => &[
                "s3:AbortMultipartUpload",
                "s3:ListMultipartUploadParts",
                "s3:PutObject",
                "s3:PutObjectAcl",
                "s3:DeleteObject",
            ],
            Self::List => &["s3:ListBucket"],
        }
    }

    /// Whether `grant` needs a statement of this kind.
    #[must_use]
    pub fn is_required_by(self, grant: &ResourceGrant) -> bool {
        match self {
            Self::Get => grant.read,
            Self::Put => grant.write,
            Self::List => grant.read || grant.write,
        }
    }

    /// `"<Kind>:<resource_id>"`.
    #[must_use]
    pub fn sid(self, resource_id: &str) -> String {
        format!("{}:{resource_id}", self.as_str())
    }

    /// Split a managed Sid into its kind and resource id.
    ///
    /// Returns `None` for Sids this subsystem does not own.
    #[must_use]
    pub fn parse_sid(sid: &str) -> Option<(Self, &str)> {
        let (kind, resource_id) = sid.split_once(':')?;
        if resource_id.is_empty() {
            return None;
        }
        let kind = match kind {
            "Get" => Self::Get,
            "Put" => Self::Put,
            "List" => Self::List,
            _ => return None,
        };
        Some((kind, resource_id))
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(read: bool, write: bool) -> ResourceGrant {
        ResourceGrant::builder()
            .resource_id("test-id".to_owned())
            .bucket_name(BucketName::new("test-egressStoreBucketName").unwrap())
            .path_prefix("test-id".to_owned())
            .grantee_account_id(AccountId::new("test-accountId").unwrap())
            .read(read)
            .write(write)
            .build()
    }

    #[test]
    fn test_should_derive_required_kinds() {
        assert_eq!(
            grant(true, true).required_kinds(),
            vec![StatementKind::Get, StatementKind::Put, StatementKind::List]
        );
        assert_eq!(
            grant(true, false).required_kinds(),
            vec![StatementKind::Get, StatementKind::List]
        );
        assert_eq!(
            grant(false, true).required_kinds(),
            vec![StatementKind::Put, StatementKind::List]
        );
        assert!(grant(false, false).required_kinds().is_empty());
    }

    #[test]
    fn test_should_round_trip_sids() {
        for kind in StatementKind::ALL {
            let sid = kind.sid("env-42");
            assert_eq!(StatementKind::parse_sid(&sid), Some((kind, "env-42")));
        }
    }

    #[test]
    fn test_should_not_claim_foreign_sids() {
        assert_eq!(StatementKind::parse_sid("AllowSSLRequestsOnly"), None);
        assert_eq!(StatementKind::parse_sid("Deny:env-42"), None);
        assert_eq!(StatementKind::parse_sid("Get:"), None);
        assert_eq!(StatementKind::parse_sid("get:env-42"), None);
    }

    #[test]
    fn test_should_keep_colons_in_resource_id() {
        assert_eq!(
            StatementKind::parse_sid("List:a:b"),
            Some((StatementKind::List, "a:b"))
        );
    }

    #[test]
    fn test_should_deserialize_grant_from_camel_case() {
        let grant: ResourceGrant = serde_json::from_value(serde_json::json!({
            "resourceId": "env-1",
            "bucketName": "bucket",
            "pathPrefix": "env-1/",
            "read": true,
            "granteeAccountId": "123456789012"
        }))
        .unwrap();
        assert!(grant.read);
        assert!(!grant.write);
        assert_eq!(grant.grantee_arn(), "arn:aws:iam::123456789012:root");
    }
}
