//! The logical schema of a stream or table.

use std::fmt;

use crate::error::{RapidsError, Result};
use crate::schema::column::{Column, Namespace};
use crate::schema::name::{ColumnName, FormatOptions, SourceName, ROWKEY_NAME, ROWTIME_NAME};
use crate::types::SqlType;

/// An ordered set of key and value columns, plus the implicit metadata
/// column `ROWTIME BIGINT` carried by every record.
///
/// All derivations (`with_alias`, `with_meta_and_key_cols_in_value`, ...)
/// return new values; a schema never mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSchema {
    metadata: Vec<Column>,
    key: Vec<Column>,
    value: Vec<Column>,
}

impl LogicalSchema {
    /// Start building a schema.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The implicit metadata columns (`ROWTIME BIGINT`).
    pub fn metadata(&self) -> &[Column] {
        &self.metadata
    }

    /// The key columns, in order.
    pub fn key(&self) -> &[Column] {
        &self.key
    }

    /// The value columns, in order.
    pub fn value(&self) -> &[Column] {
        &self.value
    }

    /// Qualify every top-level column with `source`.
    ///
    /// Nested struct fields are never re-qualified.
    pub fn with_alias(&self, source: &SourceName) -> Result<LogicalSchema> {
        if self.is_aliased() {
            return Err(RapidsError::already_aliased(format!(
                "cannot alias schema {} with '{}'",
                self, source
            )));
        }

        Ok(LogicalSchema {
            metadata: self.metadata.iter().map(|c| c.with_source(source)).collect(),
            key: self.key.iter().map(|c| c.with_source(source)).collect(),
            value: self.value.iter().map(|c| c.with_source(source)).collect(),
        })
    }

    /// Strip the qualifier from every top-level column.
    pub fn without_alias(&self) -> Result<LogicalSchema> {
        if !self.is_aliased() {
            return Err(RapidsError::not_aliased(format!(
                "schema {} carries no alias",
                self
            )));
        }

        Ok(LogicalSchema {
            metadata: self.metadata.iter().map(Column::without_source).collect(),
            key: self.key.iter().map(Column::without_source).collect(),
            value: self.value.iter().map(Column::without_source).collect(),
        })
    }

    /// Whether any top-level column carries a source qualifier.
    pub fn is_aliased(&self) -> bool {
        self.metadata
            .iter()
            .chain(&self.key)
            .chain(&self.value)
            .any(|c| c.source().is_some())
    }

    /// Find a column by bare or qualified name, searching value columns,
    /// then key columns, then metadata. Never folds case.
    pub fn find_column(&self, target: &str) -> Option<&Column> {
        self.find_value_column(target)
            .or_else(|| self.find_key_column(target))
            .or_else(|| self.metadata.iter().find(|c| c.matches(target)))
    }

    /// Find a value column by bare or qualified name.
    pub fn find_value_column(&self, target: &str) -> Option<&Column> {
        self.value.iter().find(|c| c.matches(target))
    }

    /// Find a key column by bare or qualified name.
    pub fn find_key_column(&self, target: &str) -> Option<&Column> {
        self.key.iter().find(|c| c.matches(target))
    }

    /// Whether `target` names a metadata column.
    pub fn is_meta_column(&self, target: &str) -> bool {
        self.metadata.iter().any(|c| c.matches(target))
    }

    /// Whether `target` names a key column.
    pub fn is_key_column(&self, target: &str) -> bool {
        self.find_key_column(target).is_some()
    }

    /// The ordinal position of a value column, by bare or qualified name.
    pub fn value_column_index(&self, target: &str) -> Option<u32> {
        self.value
            .iter()
            .position(|c| c.matches(target))
            .map(|i| i as u32)
    }

    /// The full names of all value columns, for error suggestions.
    pub fn value_column_names(&self) -> Vec<String> {
        self.value.iter().map(Column::full_name).collect()
    }

    /// Copy the metadata and key columns into the front of the value list.
    ///
    /// `ROWTIME` is prepended, then `ROWKEY`; any prior value columns with
    /// either bare name are removed first. Idempotent, and the inverse of
    /// [`LogicalSchema::without_meta_and_key_cols_in_value`] modulo alias.
    pub fn with_meta_and_key_cols_in_value(&self) -> LogicalSchema {
        let mut value: Vec<Column> = Vec::with_capacity(
            self.metadata.len() + self.key.len() + self.value.len(),
        );
        value.extend(self.metadata.iter().cloned());
        value.extend(self.key.iter().cloned());
        value.extend(
            self.value
                .iter()
                .filter(|c| !is_meta_or_key_name(c.name()))
                .cloned(),
        );

        LogicalSchema {
            metadata: self.metadata.clone(),
            key: self.key.clone(),
            value: reindex(value, Namespace::Value),
        }
    }

    /// Remove any projected metadata/key columns from the value list.
    pub fn without_meta_and_key_cols_in_value(&self) -> LogicalSchema {
        let value = self
            .value
            .iter()
            .filter(|c| !is_meta_or_key_name(c.name()))
            .cloned()
            .collect();

        LogicalSchema {
            metadata: self.metadata.clone(),
            key: self.key.clone(),
            value: reindex(value, Namespace::Value),
        }
    }

    /// Render the schema with the given identifier-quoting options.
    ///
    /// Key columns come first, suffixed with ` KEY`. This form is stable and
    /// used for golden assertions.
    pub fn to_string_opts(&self, options: &FormatOptions) -> String {
        let columns = self
            .key
            .iter()
            .map(|c| format!("{} KEY", c.format(options)))
            .chain(self.value.iter().map(|c| c.format(options)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{}]", columns)
    }
}

fn is_meta_or_key_name(name: &ColumnName) -> bool {
    name.as_str() == ROWTIME_NAME || name.as_str() == ROWKEY_NAME
}

fn reindex(columns: Vec<Column>, namespace: Namespace) -> Vec<Column> {
    columns
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.rebased(namespace, i as u32))
        .collect()
}

impl fmt::Display for LogicalSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_opts(&FormatOptions::default()))
    }
}

/// Builder for [`LogicalSchema`].
#[derive(Debug, Default)]
pub struct Builder {
    key: Vec<Column>,
    value: Vec<Column>,
}

impl Builder {
    /// Append a key column.
    pub fn key_column(mut self, name: ColumnName, sql_type: SqlType) -> Self {
        let index = self.key.len() as u32;
        self.key
            .push(Column::new(None, name, sql_type, Namespace::Key, index));
        self
    }

    /// Append a value column.
    pub fn value_column(mut self, name: ColumnName, sql_type: SqlType) -> Self {
        let index = self.value.len() as u32;
        self.value
            .push(Column::new(None, name, sql_type, Namespace::Value, index));
        self
    }

    /// Append existing columns to the key list, preserving any qualifier.
    pub fn key_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        for column in columns {
            let index = self.key.len() as u32;
            self.key.push(column.rebased(Namespace::Key, index));
        }
        self
    }

    /// Append existing columns to the value list, preserving any qualifier.
    pub fn value_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        for column in columns {
            let index = self.value.len() as u32;
            self.value.push(column.rebased(Namespace::Value, index));
        }
        self
    }

    /// Build the schema.
    ///
    /// Fails with `DuplicateColumn` if two keys or two values share a full
    /// name. A schema without explicit keys gets the implicit
    /// `ROWKEY STRING` key.
    pub fn build(mut self) -> Result<LogicalSchema> {
        if self.key.is_empty() {
            self.key.push(Column::new(
                None,
                ColumnName::rowkey(),
                SqlType::String,
                Namespace::Key,
                0,
            ));
        }

        check_no_duplicates(&self.key)?;
        check_no_duplicates(&self.value)?;

        Ok(LogicalSchema {
            metadata: vec![Column::new(
                None,
                ColumnName::rowtime(),
                SqlType::Bigint,
                Namespace::Meta,
                0,
            )],
            key: self.key,
            value: self.value,
        })
    }
}

fn check_no_duplicates(columns: &[Column]) -> Result<()> {
    for (i, column) in columns.iter().enumerate() {
        let full_name = column.full_name();
        if columns[..i].iter().any(|c| c.full_name() == full_name) {
            return Err(RapidsError::duplicate_column(format!(
                "'{}' appears more than once",
                full_name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some_schema() -> LogicalSchema {
        LogicalSchema::builder()
            .key_column(ColumnName::of("k0"), SqlType::Bigint)
            .value_column(ColumnName::of("f0"), SqlType::String)
            .value_column(ColumnName::of("f1"), SqlType::Bigint)
            .build()
            .unwrap()
    }

    #[test]
    fn test_implicit_rowkey() {
        let schema = LogicalSchema::builder()
            .value_column(ColumnName::of("f0"), SqlType::Boolean)
            .build()
            .unwrap();

        assert_eq!(schema.key().len(), 1);
        assert_eq!(schema.key()[0].name(), &ColumnName::rowkey());
        assert_eq!(schema.key()[0].sql_type(), &SqlType::String);
    }

    #[test]
    fn test_duplicate_value_column_rejected() {
        let result = LogicalSchema::builder()
            .value_column(ColumnName::of("f0"), SqlType::Boolean)
            .value_column(ColumnName::of("f0"), SqlType::Bigint)
            .build();

        assert!(matches!(result, Err(RapidsError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_key_and_value_may_share_bare_name() {
        let schema = LogicalSchema::builder()
            .key_column(ColumnName::of("id"), SqlType::Bigint)
            .value_column(ColumnName::of("id"), SqlType::Bigint)
            .build();

        assert!(schema.is_ok());
    }

    #[test]
    fn test_alias_round_trip() {
        let schema = some_schema();
        let aliased = schema.with_alias(&SourceName::of("bob")).unwrap();

        assert!(aliased.is_aliased());
        assert_eq!(aliased.value()[0].full_name(), "bob.f0");
        assert_eq!(aliased.metadata()[0].full_name(), "bob.ROWTIME");

        assert_eq!(aliased.without_alias().unwrap(), schema);
    }

    #[test]
    fn test_double_alias_rejected() {
        let aliased = some_schema().with_alias(&SourceName::of("bob")).unwrap();
        let result = aliased.with_alias(&SourceName::of("bob"));
        assert!(matches!(result, Err(RapidsError::AlreadyAliased { .. })));
    }

    #[test]
    fn test_without_alias_on_unaliased_rejected() {
        let result = some_schema().without_alias();
        assert!(matches!(result, Err(RapidsError::NotAliased { .. })));
    }

    #[test]
    fn test_find_value_column() {
        let schema = some_schema();
        assert!(schema.find_value_column("f0").is_some());
        assert!(schema.find_value_column("F0").is_none());
        assert!(schema.find_value_column("ROWTIME").is_none());
        assert!(schema.find_value_column("k0").is_none());
    }

    #[test]
    fn test_find_value_column_aliased() {
        let schema = some_schema().with_alias(&SourceName::of("bob")).unwrap();
        assert!(schema.find_value_column("f0").is_some());
        assert!(schema.find_value_column("bob.f0").is_some());
        assert!(schema.find_value_column("alice.f0").is_none());
    }

    #[test]
    fn test_find_column_covers_all_namespaces() {
        let schema = some_schema();
        assert_eq!(
            schema.find_column("ROWTIME").map(|c| c.namespace()),
            Some(Namespace::Meta)
        );
        assert_eq!(
            schema.find_column("k0").map(|c| c.namespace()),
            Some(Namespace::Key)
        );
        assert_eq!(
            schema.find_column("f0").map(|c| c.namespace()),
            Some(Namespace::Value)
        );
        assert!(schema.find_column("nope").is_none());
    }

    #[test]
    fn test_value_column_index() {
        let schema = some_schema();
        assert_eq!(schema.value_column_index("f0"), Some(0));
        assert_eq!(schema.value_column_index("f1"), Some(1));
        assert_eq!(schema.value_column_index("F0"), None);
        assert_eq!(schema.value_column_index("missing"), None);

        let aliased = schema.with_alias(&SourceName::of("bob")).unwrap();
        assert_eq!(aliased.value_column_index("bob.f1"), Some(1));
    }

    #[test]
    fn test_meta_and_key_cols_in_value() {
        let schema = some_schema();
        let projected = schema.with_meta_and_key_cols_in_value();

        assert_eq!(projected.value().len(), schema.value().len() + 2);
        assert_eq!(projected.value()[0].name(), &ColumnName::rowtime());
        assert_eq!(projected.value()[0].sql_type(), &SqlType::Bigint);
        assert_eq!(projected.value()[1].name(), &ColumnName::of("k0"));
        assert_eq!(projected.value()[2].name(), &ColumnName::of("f0"));
    }

    #[test]
    fn test_meta_and_key_cols_idempotent() {
        let once = some_schema().with_meta_and_key_cols_in_value();
        assert_eq!(once.with_meta_and_key_cols_in_value(), once);
    }

    #[test]
    fn test_meta_and_key_cols_round_trip() {
        let schema = some_schema();
        assert_eq!(
            schema
                .with_meta_and_key_cols_in_value()
                .without_meta_and_key_cols_in_value(),
            schema
        );
    }

    #[test]
    fn test_projection_replaces_impostors() {
        // Value columns that happen to be named ROWTIME / ROWKEY are
        // replaced by the real metadata and key columns.
        let schema = LogicalSchema::builder()
            .value_column(ColumnName::of("f0"), SqlType::Bigint)
            .value_column(ColumnName::rowkey(), SqlType::Double)
            .value_column(ColumnName::rowtime(), SqlType::Double)
            .build()
            .unwrap();

        let projected = schema.with_meta_and_key_cols_in_value();

        let names: Vec<_> = projected.value().iter().map(|c| c.name().as_str().to_string()).collect();
        assert_eq!(names, vec!["ROWTIME", "ROWKEY", "f0"]);
        assert_eq!(projected.value()[0].sql_type(), &SqlType::Bigint);
        assert_eq!(projected.value()[1].sql_type(), &SqlType::String);
    }

    #[test]
    fn test_to_string() {
        let schema = LogicalSchema::builder()
            .value_column(ColumnName::of("f0"), SqlType::Boolean)
            .value_column(
                ColumnName::of("f1"),
                SqlType::Struct(vec![("f0".into(), SqlType::Bigint)]),
            )
            .build()
            .unwrap();

        assert_eq!(
            schema.to_string(),
            "[ROWKEY STRING KEY, `f0` BOOLEAN, `f1` STRUCT<`f0` BIGINT>]"
        );
        assert_eq!(
            schema.to_string_opts(&FormatOptions::none()),
            "[ROWKEY STRING KEY, f0 BOOLEAN, f1 STRUCT<f0 BIGINT>]"
        );
    }

    #[test]
    fn test_to_string_aliased() {
        let schema = LogicalSchema::builder()
            .value_column(ColumnName::of("f0"), SqlType::Boolean)
            .build()
            .unwrap()
            .with_alias(&SourceName::of("bob"))
            .unwrap();

        assert_eq!(
            schema.to_string(),
            "[`bob`.ROWKEY STRING KEY, `bob`.`f0` BOOLEAN]"
        );
    }
}
