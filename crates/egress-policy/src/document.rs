//! Bucket-policy document model.
//!
//! A fetched policy is kept as raw JSON so that anything this subsystem does
//! not manage (foreign statements, unknown top-level keys, key order) is
//! written back exactly as it was read. Managed statements are edited in
//! place through [`Statement`] accessors; new ones are produced from the
//! typed [`PolicyStatement`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PolicyDocumentError, ReconcileError};
use crate::grant::StatementKind;

/// Default IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

const STATEMENT_KEY: &str = "Statement";
const VERSION_KEY: &str = "Version";

// ---------------------------------------------------------------------------
// Typed statement
// ---------------------------------------------------------------------------

/// A JSON value that may be written as a single item or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value.
    One(T),
    /// A list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// The values as a slice, regardless of form.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(v) => v,
        }
    }
}

/// `Principal` of a managed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account root ARNs.
    #[serde(rename = "AWS")]
    pub aws: OneOrMany<String>,
}

/// Statement shape produced by the statement builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    /// `<Kind>:<resourceId>`.
    #[serde(rename = "Sid")]
    pub sid: String,
    /// Always `"Allow"`.
    #[serde(rename = "Effect")]
    pub effect: String,
    /// Principals granted.
    #[serde(rename = "Principal")]
    pub principal: Principal,
    /// S3 actions.
    #[serde(rename = "Action")]
    pub action: Vec<String>,
    /// Bucket or object ARN(s).
    #[serde(rename = "Resource")]
    pub resource: OneOrMany<String>,
    /// Optional condition block.
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl PolicyStatement {
    /// Convert to the raw form stored in a document.
    #[must_use]
    pub fn to_statement(&self) -> Statement {
        let mut map = Map::new();
        map.insert("Sid".to_owned(), Value::String(self.sid.clone()));
        map.insert("Effect".to_owned(), Value::String(self.effect.clone()));
        let aws = string_list(self.principal.aws.as_slice());
        let mut principal = Map::new();
        principal.insert("AWS".to_owned(), aws);
        map.insert("Principal".to_owned(), Value::Object(principal));
        map.insert("Action".to_owned(), string_list(&self.action));
        let resource = match &self.resource {
            OneOrMany::One(r) => Value::String(r.clone()),
            OneOrMany::Many(rs) => string_list(rs),
        };
        map.insert("Resource".to_owned(), resource);
        if let Some(condition) = &self.condition {
            map.insert("Condition".to_owned(), condition.clone());
        }
        Statement(map)
    }
}

fn string_list(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

// ---------------------------------------------------------------------------
// Raw statement
// ---------------------------------------------------------------------------

/// One entry of a document's `Statement` list, kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement(Map<String, Value>);

impl Statement {
    /// The statement's `Sid`, if it has a string one.
    #[must_use]
    pub fn sid(&self) -> Option<&str> {
        self.0.get("Sid").and_then(Value::as_str)
    }

    /// Kind and resource id if this is a managed statement.
    #[must_use]
    pub fn managed_kind(&self) -> Option<(StatementKind, &str)> {
        self.sid().and_then(StatementKind::parse_sid)
    }

    /// ARNs listed under `Principal.AWS`, in document order.
    #[must_use]
    pub fn principal_arns(&self) -> Vec<&str> {
        match self
            .0
            .get("Principal")
            .and_then(Value::as_object)
            .and_then(|p| p.get("AWS"))
        {
            Some(Value::String(arn)) => vec![arn.as_str()],
            Some(Value::Array(arns)) => arns.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `Principal.AWS` names no account.
    #[must_use]
    pub fn has_no_principals(&self) -> bool {
        self.principal_arns().is_empty()
    }

    /// Add `arn` to `Principal.AWS` unless it is already present.
    ///
    /// A single-string principal is normalized to a list when `arn` is
    /// added; an existing match leaves the statement untouched. Returns
    /// whether the statement changed.
    ///
    /// # Errors
    /// Returns [`ReconcileError::UnsupportedPrincipal`] if the statement's
    /// principal is not an AWS account list.
    pub fn add_principal(&mut self, arn: &str) -> Result<bool, ReconcileError> {
        if self.principal_arns().contains(&arn) {
            return Ok(false);
        }
        self.principal_list_mut()?.push(Value::String(arn.to_owned()));
        Ok(true)
    }

    /// Remove every occurrence of `arn` from `Principal.AWS`.
    ///
    /// Returns whether the statement changed.
    ///
    /// # Errors
    /// Returns [`ReconcileError::UnsupportedPrincipal`] if the statement's
    /// principal is not an AWS account list.
    pub fn remove_principal(&mut self, arn: &str) -> Result<bool, ReconcileError> {
        let arns = self.principal_list_mut()?;
        let before = arns.len();
        arns.retain(|v| v.as_str() != Some(arn));
        Ok(arns.len() != before)
    }

    /// Parse into the typed form.
    ///
    /// # Errors
    /// Returns an error if the statement does not have the managed shape.
    pub fn to_typed(&self) -> Result<PolicyStatement, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    /// The raw JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn principal_list_mut(&mut self) -> Result<&mut Vec<Value>, ReconcileError> {
        let sid = self.sid().unwrap_or_default().to_owned();
        let unsupported = || ReconcileError::UnsupportedPrincipal { sid: sid.clone() };

        let principal = self
            .0
            .entry("Principal")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(unsupported)?;
        let aws = principal
            .entry("AWS")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(single) = aws.as_str().map(ToOwned::to_owned) {
            *aws = Value::Array(vec![Value::String(single)]);
        }
        aws.as_array_mut().ok_or_else(unsupported)
    }
}

impl From<PolicyStatement> for Statement {
    fn from(statement: PolicyStatement) -> Self {
        statement.to_statement()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A bucket-policy document.
///
/// Two documents are equal when they serialize to the same JSON value,
/// regardless of how they were built.
#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    /// Top-level members other than the statements, in original order. The
    /// `Statement` key is kept as a placeholder so its position survives.
    root: Map<String, Value>,
    statements: Vec<Statement>,
}

impl PartialEq for PolicyDocument {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl PolicyDocument {
    /// An empty document with no statements.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse policy text.
    ///
    /// Empty or whitespace-only text is an empty document. A missing
    /// `Statement` is an empty list, and a single statement object is
    /// treated as a one-element list.
    ///
    /// # Errors
    /// Returns a [`PolicyDocumentError`] if the text is not a JSON object
    /// or its `Statement` member has the wrong shape.
    pub fn parse(text: &str) -> Result<Self, PolicyDocumentError> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        let Value::Object(mut root) = serde_json::from_str::<Value>(text)? else {
            return Err(PolicyDocumentError::NotAnObject);
        };

        let statements = match root.get_mut(STATEMENT_KEY).map(Value::take) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(single)) => vec![Statement(single)],
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(map) => Ok(Statement(map)),
                    _ => Err(PolicyDocumentError::InvalidStatement { index }),
                })
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(PolicyDocumentError::InvalidStatementList),
        };

        Ok(Self { root, statements })
    }

    /// The statements in document order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// The same document with its statements replaced.
    #[must_use]
    pub fn with_statements(mut self, statements: Vec<Statement>) -> Self {
        self.statements = statements;
        self
    }

    /// The `Version` member, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.root.get(VERSION_KEY).and_then(Value::as_str)
    }

    /// Set `Version` to `version` if the document has none.
    pub fn ensure_version(&mut self, version: &str) {
        if self.version().is_none() {
            self.root.shift_insert(0, VERSION_KEY.to_owned(), Value::String(version.to_owned()));
        }
    }

    /// Statement with the given Sid.
    #[must_use]
    pub fn find(&self, sid: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.sid() == Some(sid))
    }

    /// Account ARNs holding any managed statement for `resource_id`.
    #[must_use]
    pub fn grantees(&self, resource_id: &str) -> BTreeSet<String> {
        self.statements
            .iter()
            .filter(|s| s.managed_kind().is_some_and(|(_, id)| id == resource_id))
            .flat_map(Statement::principal_arns)
            .map(ToOwned::to_owned)
            .collect()
    }

    /// The document as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = self.root.clone();
        let statements = Value::Array(
            self.statements
                .iter()
                .map(|s| Value::Object(s.0.clone()))
                .collect(),
        );
        // Replacing an existing key keeps its position.
        root.insert(STATEMENT_KEY.to_owned(), statements);
        Value::Object(root)
    }

    /// Serialize to compact policy text.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_value())
    }
}
