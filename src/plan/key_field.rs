//! Key-field tracking.

use crate::error::{RapidsError, Result};
use crate::schema::{Column, ColumnName, LogicalSchema, SourceName};

/// The value column (if any) whose value equals the partition key for
/// every row produced by a plan node.
///
/// A pure attribute recomputed at node construction; joins may legitimately
/// carry `None` (outer joins in particular).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField {
    name: Option<ColumnName>,
}

impl KeyField {
    /// A key field naming `column`.
    pub fn of(name: ColumnName) -> Self {
        Self { name: Some(name) }
    }

    /// No key field: no value column mirrors the key.
    pub fn none() -> Self {
        Self { name: None }
    }

    /// The tracked column name, possibly qualified.
    pub fn name(&self) -> Option<&ColumnName> {
        self.name.as_ref()
    }

    /// Whether a column is tracked.
    pub fn is_some(&self) -> bool {
        self.name.is_some()
    }

    /// Resolve the tracked name against a schema's value columns.
    pub fn resolve<'a>(&self, schema: &'a LogicalSchema) -> Option<&'a Column> {
        self.name
            .as_ref()
            .and_then(|name| schema.find_value_column(name.as_str()))
    }

    /// Check the invariant: a tracked name must resolve in the schema.
    pub fn validate(&self, schema: &LogicalSchema) -> Result<()> {
        match &self.name {
            Some(name) if schema.find_value_column(name.as_str()).is_none() => {
                Err(RapidsError::unknown_column(format!(
                    "key field '{}' is not in the schema {}",
                    name, schema
                )))
            }
            _ => Ok(()),
        }
    }

    /// Qualify the tracked name with `source`, replacing any existing
    /// qualifier.
    pub fn with_source(&self, source: &SourceName) -> KeyField {
        let name = self.name.as_ref().map(|name| {
            let bare = bare_name(name.as_str());
            ColumnName::of(format!("{}.{}", source, bare))
        });
        KeyField { name }
    }
}

/// Strip any `source.` qualifier from a field name.
fn bare_name(name: &str) -> &str {
    match name.split_once('.') {
        Some((_, bare)) => bare,
        None => name,
    }
}
