//! Schema column model.

use std::fmt;

use crate::schema::name::{ColumnName, FormatOptions, SourceName};
use crate::types::SqlType;

/// The section of a schema a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Part of the record key
    Key,
    /// Part of the record value
    Value,
    /// Implicit per-record metadata (ROWTIME)
    Meta,
}

/// A single column of a [`LogicalSchema`](crate::schema::LogicalSchema).
///
/// Two columns are equal iff every attribute matches, including the
/// qualifying source and the ordinal index within the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    source: Option<SourceName>,
    name: ColumnName,
    sql_type: SqlType,
    namespace: Namespace,
    index: u32,
}

impl Column {
    /// Create a column.
    pub fn new(
        source: Option<SourceName>,
        name: ColumnName,
        sql_type: SqlType,
        namespace: Namespace,
        index: u32,
    ) -> Self {
        Self {
            source,
            name,
            sql_type,
            namespace,
            index,
        }
    }

    /// The qualifying source, if the column is aliased.
    pub fn source(&self) -> Option<&SourceName> {
        self.source.as_ref()
    }

    /// The bare column name.
    pub fn name(&self) -> &ColumnName {
        &self.name
    }

    /// The column's SQL type.
    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    /// The namespace this column belongs to.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Ordinal position within the namespace.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// `source.name` when qualified, else `name`.
    pub fn full_name(&self) -> String {
        match &self.source {
            Some(source) => format!("{}.{}", source, self.name),
            None => self.name.to_string(),
        }
    }

    /// Whether a bare or qualified lookup string refers to this column.
    ///
    /// A bare name matches on the column name alone; a qualified
    /// `source.name` must match both parts. Matching never folds case.
    pub fn matches(&self, target: &str) -> bool {
        match target.split_once('.') {
            Some((source, name)) => {
                self.source.as_ref().map(|s| s.as_str()) == Some(source)
                    && self.name.as_str() == name
            }
            None => self.name.as_str() == target,
        }
    }

    /// A copy of this column qualified by `source`.
    pub(crate) fn with_source(&self, source: &SourceName) -> Column {
        Column {
            source: Some(source.clone()),
            ..self.clone()
        }
    }

    /// A copy of this column with the qualifier removed.
    pub(crate) fn without_source(&self) -> Column {
        Column {
            source: None,
            ..self.clone()
        }
    }

    /// A copy of this column re-homed to a namespace and index.
    pub(crate) fn rebased(&self, namespace: Namespace, index: u32) -> Column {
        Column {
            namespace,
            index,
            ..self.clone()
        }
    }

    /// Render `qualifier.name type`, quoting each identifier per `options`.
    ///
    /// Struct field names inside the type are quoted too.
    pub fn format(&self, options: &FormatOptions) -> String {
        let name = match &self.source {
            Some(source) => format!(
                "{}.{}",
                options.escape(source.as_str()),
                options.escape(self.name.as_str())
            ),
            None => options.escape(self.name.as_str()),
        };
        format!("{} {}", name, format_type(&self.sql_type, options))
    }
}

/// Render a type, quoting struct field names per `options`.
pub(crate) fn format_type(sql_type: &SqlType, options: &FormatOptions) -> String {
    match sql_type {
        SqlType::Array(element) => format!("ARRAY<{}>", format_type(element, options)),
        SqlType::Map(value) => format!("MAP<STRING, {}>", format_type(value, options)),
        SqlType::Struct(fields) => {
            let fields = fields
                .iter()
                .map(|(name, t)| format!("{} {}", options.escape(name), format_type(t, options)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("STRUCT<{}>", fields)
        }
        other => other.to_string(),
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.full_name(), self.sql_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(source: Option<&str>, name: &str) -> Column {
        Column::new(
            source.map(SourceName::of),
            ColumnName::of(name),
            SqlType::Integer,
            Namespace::Value,
            0,
        )
    }

    #[test]
    fn test_full_name() {
        assert_eq!(column(None, "a").full_name(), "a");
        assert_eq!(column(Some("s"), "a").full_name(), "s.a");
    }

    #[test]
    fn test_matches_bare_and_qualified() {
        let unaliased = column(None, "a");
        assert!(unaliased.matches("a"));
        assert!(!unaliased.matches("s.a"));
        assert!(!unaliased.matches("A"));

        let aliased = column(Some("s"), "a");
        assert!(aliased.matches("a"));
        assert!(aliased.matches("s.a"));
        assert!(!aliased.matches("t.a"));
    }

    #[test]
    fn test_equality_is_attribute_wise() {
        assert_eq!(column(Some("s"), "a"), column(Some("s"), "a"));
        assert_ne!(column(Some("s"), "a"), column(None, "a"));
        assert_ne!(column(None, "a"), column(None, "a").rebased(Namespace::Value, 1));
    }

    #[test]
    fn test_format_quotes_identifiers() {
        let col = Column::new(
            Some(SourceName::of("bob")),
            ColumnName::of("f0"),
            SqlType::Struct(vec![("inner".into(), SqlType::Bigint)]),
            Namespace::Value,
            0,
        );
        assert_eq!(
            col.format(&FormatOptions::default()),
            "`bob`.`f0` STRUCT<`inner` BIGINT>"
        );
        assert_eq!(
            col.format(&FormatOptions::none()),
            "bob.f0 STRUCT<inner BIGINT>"
        );
    }
}
