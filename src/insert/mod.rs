//! Literal row construction for `INSERT INTO ... VALUES`.

use std::collections::HashMap;

use crate::catalog::{Catalog, Source};
use crate::config::PlannerConfig;
use crate::error::{RapidsError, Result};
use crate::expr::Expression;
use crate::schema::coerce::coerce;
use crate::schema::{Column, ColumnName, SourceName, ROWKEY_NAME, ROWTIME_NAME};
use crate::types::{Row, Value};

/// Injected time source; insert rows without an explicit `ROWTIME` are
/// stamped from it.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Fixed time, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// A resolved `INSERT INTO ... VALUES` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRequest {
    /// Target stream or table
    pub target: SourceName,
    /// Explicit column list; empty means all key then value columns
    pub columns: Vec<ColumnName>,
    /// One literal expression per column
    pub values: Vec<Expression>,
}

/// The record handed to the serializer collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRow {
    /// Record timestamp in epoch millis
    pub timestamp: i64,
    /// Key struct, one field per key column
    pub key: Value,
    /// Value row over the target's value columns
    pub value: Row,
}

/// Plans insert-values statements against the catalog.
pub struct InsertValuesPlanner<'a> {
    catalog: &'a dyn Catalog,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
}

impl<'a> InsertValuesPlanner<'a> {
    /// Create a planner over the collaborators.
    pub fn new(catalog: &'a dyn Catalog, config: &'a PlannerConfig, clock: &'a dyn Clock) -> Self {
        Self {
            catalog,
            config,
            clock,
        }
    }

    /// Build the record for one insert statement.
    pub fn plan(&self, request: &InsertRequest) -> Result<InsertRow> {
        if !self.config.insert_values_enabled {
            return Err(RapidsError::insert_disabled(
                "the server has disabled INSERT INTO ... VALUES functionality".to_string(),
            ));
        }

        let source = self.catalog.source(&request.target).ok_or_else(|| {
            RapidsError::unknown_source(format!(
                "cannot insert values into an unknown stream/table: '{}'",
                request.target
            ))
        })?;

        if source.is_windowed() {
            return Err(RapidsError::insert_windowed(format!(
                "cannot insert values into windowed source '{}'",
                request.target
            )));
        }

        let columns = if request.columns.is_empty() {
            implicit_columns(&source, &request.values)?
        } else {
            request.columns.clone()
        };
        if columns.len() != request.values.len() {
            return Err(RapidsError::insert_type(format!(
                "expected one value per column; columns: {}, values: {}",
                columns.len(),
                request.values.len()
            )));
        }

        let mut values = resolve_values(&source, &columns, &request.values)?;
        reconcile_key(&source, &mut values)?;

        let timestamp = match values.get(ROWTIME_NAME) {
            Some(value) => value.try_as_i64()?.unwrap_or_else(|| self.clock.now_millis()),
            None => self.clock.now_millis(),
        };

        let key = build_key(&source, &values);
        let value = build_value(&source, &values);

        Ok(InsertRow {
            timestamp,
            key,
            value,
        })
    }
}

/// Column list when the statement omits one: keys, then values, in schema
/// order.
fn implicit_columns(source: &Source, values: &[Expression]) -> Result<Vec<ColumnName>> {
    let schema = source.schema();
    let names: Vec<ColumnName> = schema
        .key()
        .iter()
        .chain(schema.value())
        .map(|c| c.name().clone())
        .collect();

    if names.len() != values.len() {
        return Err(RapidsError::insert_type(format!(
            "expected a value for each column. columns: [{}], got {} value(s)",
            names
                .iter()
                .map(ColumnName::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            values.len()
        )));
    }

    Ok(names)
}

fn resolve_values(
    source: &Source,
    columns: &[ColumnName],
    values: &[Expression],
) -> Result<HashMap<String, Value>> {
    let mut resolved = HashMap::with_capacity(columns.len());

    for (column, expression) in columns.iter().zip(values) {
        let target = source
            .schema()
            .find_column(column.as_str())
            .map(Column::sql_type)
            .cloned()
            .ok_or_else(|| {
                RapidsError::unknown_column(format!(
                    "'{}' is not a column of '{}'",
                    column,
                    source.name()
                ))
            })?;

        let Some(literal) = expression.literal_value() else {
            return Err(RapidsError::insert_non_literal(format!(
                "only literals are supported, got {} for column '{}'",
                expression, column
            )));
        };

        let coerced = coerce(&literal, &target).ok_or_else(|| {
            RapidsError::insert_type(format!(
                "expected type {} for column '{}' but got {}",
                target, column, literal
            ))
        })?;

        resolved.insert(column.to_string(), coerced);
    }

    Ok(resolved)
}

/// Keep the declared key column and `ROWKEY` in agreement: if only one was
/// supplied the other is derived, and if both were they must match.
fn reconcile_key(source: &Source, values: &mut HashMap<String, Value>) -> Result<()> {
    let Some(key_name) = source.key_field().name() else {
        return Ok(());
    };
    let key_name = key_name.as_str().to_string();

    let key_value = values.get(&key_name).filter(|v| !v.is_null()).cloned();
    let row_key_value = values.get(ROWKEY_NAME).filter(|v| !v.is_null()).cloned();

    match (key_value, row_key_value) {
        (Some(key_value), None) => {
            values.insert(ROWKEY_NAME.to_string(), Value::String(key_value.to_key_string()));
        }
        (None, Some(row_key_value)) => {
            values.insert(key_name, row_key_value);
        }
        (Some(key_value), Some(row_key_value)) => {
            let row_key_text = row_key_value.to_key_string();
            if key_value.to_key_string() != row_key_text {
                return Err(RapidsError::insert_key(format!(
                    "expected ROWKEY and {} to match but got {} and {} respectively",
                    key_name, row_key_text, key_value
                )));
            }
        }
        (None, None) => {}
    }

    Ok(())
}

fn build_key(source: &Source, values: &HashMap<String, Value>) -> Value {
    Value::Struct(
        source
            .schema()
            .key()
            .iter()
            .map(|column| {
                let value = values
                    .get(column.name().as_str())
                    .cloned()
                    .unwrap_or(Value::Null);
                (column.name().to_string(), value)
            })
            .collect(),
    )
}

fn build_value(source: &Source, values: &HashMap<String, Value>) -> Row {
    Row::new(
        source
            .schema()
            .value()
            .iter()
            .map(|column| {
                values
                    .get(column.name().as_str())
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::plan::{KeyField, NodeType};
    use crate::schema::LogicalSchema;
    use crate::types::SqlType;

    fn catalog() -> MemoryCatalog {
        let schema = LogicalSchema::builder()
            .value_column(ColumnName::of("a"), SqlType::Integer)
            .value_column(ColumnName::of("b"), SqlType::String)
            .value_column(ColumnName::of("ts"), SqlType::Bigint)
            .build()
            .unwrap();

        let source = Source::builder(SourceName::of("S"), NodeType::Stream, schema)
            .key_field(KeyField::of(ColumnName::of("a")))
            .topic("s-topic")
            .build();

        let catalog = MemoryCatalog::new();
        catalog.register(source);
        catalog
    }

    fn plan(request: &InsertRequest) -> Result<InsertRow> {
        let catalog = catalog();
        let config = PlannerConfig::default();
        let clock = FixedClock(1_000);
        InsertValuesPlanner::new(&catalog, &config, &clock).plan(request)
    }

    fn request(columns: &[&str], values: Vec<Expression>) -> InsertRequest {
        InsertRequest {
            target: SourceName::of("S"),
            columns: columns.iter().map(|c| ColumnName::of(*c)).collect(),
            values,
        }
    }

    #[test]
    fn test_insert_with_explicit_columns() {
        let row = plan(&request(
            &["a", "b"],
            vec![Expression::integer(1), Expression::string("x")],
        ))
        .unwrap();

        assert_eq!(row.timestamp, 1_000);
        assert_eq!(
            row.key,
            Value::Struct(vec![("ROWKEY".to_string(), Value::from("1"))])
        );
        assert_eq!(
            row.value.columns(),
            &[Value::Integer(1), Value::from("x"), Value::Null]
        );
    }

    #[test]
    fn test_implicit_columns_cover_key_then_value() {
        let row = plan(&request(
            &[],
            vec![
                Expression::string("1"),
                Expression::integer(1),
                Expression::string("x"),
                Expression::long(77),
            ],
        ))
        .unwrap();

        assert_eq!(
            row.value.columns(),
            &[Value::Integer(1), Value::from("x"), Value::Bigint(77)]
        );
    }

    #[test]
    fn test_explicit_rowtime_wins_over_clock() {
        let row = plan(&request(
            &["ROWTIME", "a"],
            vec![Expression::long(5_555), Expression::integer(1)],
        ))
        .unwrap();
        assert_eq!(row.timestamp, 5_555);
    }

    #[test]
    fn test_rowkey_derived_from_key_field() {
        let row = plan(&request(&["a"], vec![Expression::integer(42)])).unwrap();
        assert_eq!(
            row.key,
            Value::Struct(vec![("ROWKEY".to_string(), Value::from("42"))])
        );
    }

    #[test]
    fn test_key_field_derived_from_rowkey() {
        let row = plan(&request(&["ROWKEY", "b"], vec![
            Expression::string("9"),
            Expression::string("x"),
        ]));
        // ROWKEY is STRING; the key column a is INTEGER, so the derived
        // value is the string and coercion happens at the column, not here.
        let row = row.unwrap();
        assert_eq!(row.value.column(0), Some(&Value::from("9")));
    }

    #[test]
    fn test_key_mismatch_rejected() {
        let err = plan(&request(
            &["ROWKEY", "a"],
            vec![Expression::string("2"), Expression::integer(1)],
        ));
        assert!(matches!(err, Err(RapidsError::InsertKeyMismatch { .. })));
    }

    #[test]
    fn test_non_literal_rejected() {
        let err = plan(&request(&["a"], vec![Expression::column("a")]));
        assert!(matches!(err, Err(RapidsError::InsertNonLiteral { .. })));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = plan(&request(&["a"], vec![Expression::string("nope")]));
        assert!(matches!(err, Err(RapidsError::InsertTypeMismatch { .. })));
    }

    #[test]
    fn test_disabled_by_config() {
        let catalog = catalog();
        let config = PlannerConfig::default().with_insert_values_enabled(false);
        let clock = FixedClock(0);
        let err = InsertValuesPlanner::new(&catalog, &config, &clock).plan(&request(
            &["a"],
            vec![Expression::integer(1)],
        ));
        assert!(matches!(err, Err(RapidsError::InsertDisabled { .. })));
    }

    #[test]
    fn test_windowed_target_rejected() {
        let schema = LogicalSchema::builder()
            .value_column(ColumnName::of("a"), SqlType::Integer)
            .build()
            .unwrap();
        let source = Source::builder(SourceName::of("W"), NodeType::Table, schema)
            .windowed(true)
            .build();
        let catalog = MemoryCatalog::new();
        catalog.register(source);

        let config = PlannerConfig::default();
        let clock = FixedClock(0);
        let err = InsertValuesPlanner::new(&catalog, &config, &clock).plan(&InsertRequest {
            target: SourceName::of("W"),
            columns: vec![ColumnName::of("a")],
            values: vec![Expression::integer(1)],
        });
        assert!(matches!(
            err,
            Err(RapidsError::InsertIntoWindowedNotAllowed { .. })
        ));
    }
}
