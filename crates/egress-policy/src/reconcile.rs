//! Merge grants into, and remove them from, an existing policy.
//!
//! Both directions are read-modify-write over the whole statement list and
//! are only safe while the bucket-policy lock is held.
//!
//! Merging is accretive: an account is added to a statement's principals
//! if missing and nothing else is removed, so applying the same grant twice
//! leaves the document unchanged. Revoking removes exactly one account and
//! drops a managed statement once its last principal is gone, because a
//! statement with an empty principal list is rejected by S3.

use tracing::debug;

use egress_core::AccountId;

use crate::builder::TemplateFn;
use crate::document::{PolicyDocument, Statement};
use crate::error::ReconcileError;
use crate::grant::{ResourceGrant, StatementKind};

/// Function that adds an account to an existing statement. Returns whether
/// the statement changed.
pub type PrincipalMergeFn = fn(&mut Statement, &AccountId) -> Result<bool, ReconcileError>;

/// Add the account's root ARN to the statement's principals, deduplicating
/// by exact ARN.
///
/// # Errors
/// Returns [`ReconcileError::UnsupportedPrincipal`] if the statement has a
/// non-account principal.
pub fn merge_principal(statement: &mut Statement, account: &AccountId) -> Result<bool, ReconcileError> {
    statement.add_principal(&account.root_arn())
}

/// Compute the statement list after applying `grant` to `existing`.
///
/// Templates are applied in the given order. A template whose Sid is
/// already present is merged into that statement with `merge`; otherwise
/// the template is appended. Statements the grant does not touch, managed
/// or foreign, are returned as they were and in the same position.
///
/// # Errors
/// Returns a [`ReconcileError`] if a template is not a managed statement
/// for the grant's resource, or if `merge` fails.
pub fn reconcile(
    existing: &PolicyDocument,
    grant: &ResourceGrant,
    templates: &[TemplateFn],
    merge: PrincipalMergeFn,
) -> Result<Vec<Statement>, ReconcileError> {
    let mut statements = existing.statements().to_vec();

    for template_fn in templates {
        let Some(template) = template_fn(grant) else {
            continue;
        };

        match StatementKind::parse_sid(&template.sid) {
            Some((_, resource_id)) if resource_id == grant.resource_id => {}
            _ => {
                return Err(ReconcileError::UnmanagedTemplate {
                    sid: template.sid,
                    resource_id: grant.resource_id.clone(),
                });
            }
        }

        match statements
            .iter_mut()
            .find(|s| s.sid() == Some(template.sid.as_str()))
        {
            Some(statement) => {
                let changed = merge(statement, &grant.grantee_account_id)?;
                debug!(sid = %template.sid, changed, "merged grantee into statement");
            }
            None => {
                debug!(sid = %template.sid, "adding statement");
                statements.push(template.to_statement());
            }
        }
    }

    Ok(statements)
}

/// Compute the statement list after removing the grantee from every
/// managed statement of the grant's resource.
///
/// The grant's read/write flags are ignored: the account is removed from
/// Get, Put and List statements alike. Statements left without principals
/// are dropped. Revoking an account that holds no access is a no-op.
///
/// # Errors
/// Returns [`ReconcileError::UnsupportedPrincipal`] if a managed statement
/// of the resource has a non-account principal.
pub fn revoke(
    existing: &PolicyDocument,
    grant: &ResourceGrant,
) -> Result<Vec<Statement>, ReconcileError> {
    let arn = grant.grantee_arn();
    let mut statements = Vec::with_capacity(existing.statements().len());

    for statement in existing.statements() {
        let owned = statement
            .managed_kind()
            .is_some_and(|(_, id)| id == grant.resource_id);
        if !owned {
            statements.push(statement.clone());
            continue;
        }

        let mut revised = statement.clone();
        if !revised.remove_principal(&arn)? {
            statements.push(statement.clone());
        } else if revised.has_no_principals() {
            debug!(sid = ?revised.sid(), "dropping statement without principals");
        } else {
            statements.push(revised);
        }
    }

    Ok(statements)
}
