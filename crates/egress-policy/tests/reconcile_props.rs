//! Property tests for merging grants into and revoking them from bucket policies.

use egress_core::{AccountId, BucketName};
use egress_policy::{
    DEFAULT_TEMPLATES, PolicyDocument, ResourceGrant, Statement, merge_principal, reconcile, revoke,
};
use proptest::prelude::*;
use serde::Deserialize;
use serde_json::json;

const BUCKET: &str = "egress-props-bucket";

fn grant(resource: &str, account: &str, read: bool, write: bool) -> ResourceGrant {
    ResourceGrant::builder()
        .resource_id(resource.to_owned())
        .bucket_name(BucketName::new(BUCKET).unwrap())
        .path_prefix(format!("{resource}/"))
        .grantee_account_id(AccountId::new(account).unwrap())
        .read(read)
        .write(write)
        .build()
}

fn grant_strategy() -> impl Strategy<Value = ResourceGrant> {
    (
        prop::sample::select(vec!["env-a", "env-b", "store-c"]),
        "[0-9]{12}",
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(resource, account, read, write)| grant(resource, &account, read, write))
}

fn foreign() -> Statement {
    Statement::deserialize(json!({
        "Sid": "DenyInsecureTransport",
        "Effect": "Deny",
        "Principal": "*",
        "Action": "s3:*",
        "Resource": format!("arn:aws:s3:::{BUCKET}/*"),
        "Condition": { "Bool": { "aws:SecureTransport": "false" } }
    }))
    .unwrap()
}

fn apply(doc: &PolicyDocument, grant: &ResourceGrant) -> PolicyDocument {
    let statements = reconcile(doc, grant, &DEFAULT_TEMPLATES, merge_principal).unwrap();
    doc.clone().with_statements(statements)
}

fn apply_all(grants: &[ResourceGrant]) -> PolicyDocument {
    grants.iter().fold(
        PolicyDocument::empty().with_statements(vec![foreign()]),
        |doc, g| apply(&doc, g),
    )
}

proptest! {
    #[test]
    fn prop_every_grant_is_reflected_without_duplicates(
        grants in proptest::collection::vec(grant_strategy(), 1..12)
    ) {
        let doc = apply_all(&grants);

        for g in &grants {
            for kind in g.required_kinds() {
                let statement = doc.find(&kind.sid(&g.resource_id));
                prop_assert!(statement.is_some());
                let arn = g.grantee_arn();
                prop_assert!(statement.unwrap().principal_arns().contains(&arn.as_str()));
            }
        }
        for statement in doc.statements() {
            let arns = statement.principal_arns();
            let mut deduped = arns.clone();
            deduped.sort_unstable();
            deduped.dedup();
            prop_assert_eq!(arns.len(), deduped.len());
        }
    }

    #[test]
    fn prop_reapplying_a_grant_changes_nothing(
        grants in proptest::collection::vec(grant_strategy(), 1..12),
        pick in any::<prop::sample::Index>()
    ) {
        let doc = apply_all(&grants);
        let again = apply(&doc, pick.get(&grants));
        prop_assert_eq!(doc, again);
    }

    #[test]
    fn prop_foreign_statement_survives_grants_and_revokes(
        grants in proptest::collection::vec(grant_strategy(), 1..12),
        pick in any::<prop::sample::Index>()
    ) {
        let doc = apply_all(&grants);
        prop_assert_eq!(&doc.statements()[0], &foreign());

        let revoked = doc.clone().with_statements(revoke(&doc, pick.get(&grants)).unwrap());
        prop_assert_eq!(&revoked.statements()[0], &foreign());
    }

    #[test]
    fn prop_revoke_removes_only_the_grantee(
        grants in proptest::collection::vec(grant_strategy(), 1..12),
        pick in any::<prop::sample::Index>()
    ) {
        let doc = apply_all(&grants);
        let target = pick.get(&grants);
        let arn = target.grantee_arn();

        let revoked = doc.clone().with_statements(revoke(&doc, target).unwrap());

        let mut expected = doc.grantees(&target.resource_id);
        expected.remove(&arn);
        prop_assert_eq!(revoked.grantees(&target.resource_id), expected);

        for other in ["env-a", "env-b", "store-c"] {
            if other != target.resource_id {
                prop_assert_eq!(revoked.grantees(other), doc.grantees(other));
            }
        }
        for statement in revoked.statements() {
            prop_assert!(statement.managed_kind().is_none() || !statement.has_no_principals());
        }

        let twice = revoked.clone().with_statements(revoke(&revoked, target).unwrap());
        prop_assert_eq!(revoked, twice);
    }
}

#[test]
fn test_should_leave_grant_without_access_as_noop() {
    let doc = apply_all(&[grant("env-a", "111122223333", true, false)]);
    let unchanged = apply(&doc, &grant("env-a", "444455556666", false, false));
    assert_eq!(doc, unchanged);
}
