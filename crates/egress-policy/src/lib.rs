//! S3 bucket-policy management for data egress.
//!
//! Grants give an external AWS account read and/or write access to one
//! resource's path prefix inside a shared egress bucket. Each grant maps to
//! up to three managed statements whose Sids are `Get:<resourceId>`,
//! `Put:<resourceId>` and `List:<resourceId>`; everything else in the bucket
//! policy is left alone.
//!
//! # Architecture
//!
//! ```text
//! BucketPolicyUpdater (grant_access / revoke_access)
//!        |  with_lock("bucket-policy:<bucket>")
//!        v
//! PolicyStore::get_policy --> PolicyDocument::parse
//!        |
//!        v
//! reconcile(templates, merge_principal) | revoke
//!        |
//!        v
//! PolicyStore::put_policy --> AuditDispatcher
//! ```

pub mod audit;
pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod grant;
pub mod reconcile;
pub mod store;
pub mod updater;

pub use audit::{
    AuditDispatcher, AuditEvent, AuditSink, AuditWriteFailed, MemoryAuditSink, TracingAuditSink,
};
pub use builder::{
    DEFAULT_TEMPLATES, TemplateFn, get_statement_template, list_statement_template,
    put_statement_template,
};
pub use config::{UpdaterConfig, lock_id_for_bucket};
pub use document::{OneOrMany, POLICY_VERSION, PolicyDocument, PolicyStatement, Principal, Statement};
pub use error::{PolicyDocumentError, ReconcileError, UpdaterError};
pub use grant::{ResourceGrant, StatementKind};
pub use reconcile::{PrincipalMergeFn, merge_principal, reconcile, revoke};
pub use store::{InMemoryPolicyStore, PolicyStore, PolicyStoreError};
pub use updater::BucketPolicyUpdater;
