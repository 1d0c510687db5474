//! Statement templates for a grant.
//!
//! Each function maps a [`ResourceGrant`] to the statement one kind of access
//! needs, or `None` when the grant does not call for that kind. The
//! templates carry only the grantee; merging with accounts already in the
//! bucket policy is the reconciler's job.

use serde_json::json;

use egress_core::{bucket_arn, object_arn};

use crate::document::{OneOrMany, PolicyStatement, Principal};
use crate::grant::{ResourceGrant, StatementKind};

/// A statement template function.
pub type TemplateFn = fn(&ResourceGrant) -> Option<PolicyStatement>;

/// Templates in the order they are applied: Get, Put, List.
pub const DEFAULT_TEMPLATES: [TemplateFn; 3] = [
    get_statement_template,
    put_statement_template,
    list_statement_template,
];

/// Object read statement, present when the grant allows reads.
#[must_use]
pub fn get_statement_template(grant: &ResourceGrant) -> Option<PolicyStatement> {
    StatementKind::Get
        .is_required_by(grant)
        .then(|| object_statement(StatementKind::Get, grant))
}

/// Object write statement, present when the grant allows writes.
#[must_use]
pub fn put_statement_template(grant: &ResourceGrant) -> Option<PolicyStatement> {
    StatementKind::Put
        .is_required_by(grant)
        .then(|| object_statement(StatementKind::Put, grant))
}

/// Prefix listing statement, present when the grant allows reads or writes.
#[must_use]
pub fn list_statement_template(grant: &ResourceGrant) -> Option<PolicyStatement> {
    if !StatementKind::List.is_required_by(grant) {
        return None;
    }
    let mut statement = base_statement(StatementKind::List, grant);
    statement.resource = OneOrMany::One(bucket_arn(grant.bucket_name.as_str()));
    statement.condition = Some(json!({
        "StringLike": { "s3:prefix": [prefix_pattern(grant)] }
    }));
    Some(statement)
}

fn object_statement(kind: StatementKind, grant: &ResourceGrant) -> PolicyStatement {
    let mut statement = base_statement(kind, grant);
    statement.resource = OneOrMany::One(object_arn(
        grant.bucket_name.as_str(),
        &prefix_pattern(grant),
    ));
    statement
}

fn base_statement(kind: StatementKind, grant: &ResourceGrant) -> PolicyStatement {
    PolicyStatement {
        sid: kind.sid(&grant.resource_id),
        effect: "Allow".to_owned(),
        principal: Principal {
            aws: OneOrMany::Many(vec![grant.grantee_arn()]),
        },
        action: kind.actions().iter().map(|a| (*a).to_owned()).collect(),
        resource: OneOrMany::Many(Vec::new()),
        condition: None,
    }
}

fn prefix_pattern(grant: &ResourceGrant) -> String {
    format!("{}*", grant.path_prefix)
}
