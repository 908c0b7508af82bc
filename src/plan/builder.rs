//! Plan construction.
//!
//! [`PlanBuilder`] turns resolved statements into plan-node trees, applying
//! the key-field and repartitioning rules along the way. Builders are cheap
//! views over the catalog, function registry, and configuration; all state
//! lives in the nodes they produce.

use std::sync::Arc;

use crate::catalog::{Catalog, Format};
use crate::config::PlannerConfig;
use crate::error::{RapidsError, Result};
use crate::expr::{rewrite_rowtime, Expression, TypeResolver};
use crate::function::FunctionRegistry;
use crate::plan::context::Stacker;
use crate::plan::join::{plan_join, JoinParams};
use crate::plan::key_field::KeyField;
use crate::plan::node::{PlanNode, SelectExpression};
use crate::plan::window::WindowType;
use crate::schema::{Column, ColumnName, LogicalSchema, SourceName};
use crate::types::SqlType;

/// Separator joining grouping expressions into a synthetic key name.
pub const GROUP_BY_COLUMN_SEPARATOR: &str = "|+|";

/// Builds plan nodes, enforcing schema, typing, and key-field rules.
pub struct PlanBuilder<'a> {
    catalog: &'a dyn Catalog,
    functions: &'a dyn FunctionRegistry,
    config: &'a PlannerConfig,
}

impl<'a> PlanBuilder<'a> {
    /// Create a builder over the planning collaborators.
    pub fn new(
        catalog: &'a dyn Catalog,
        functions: &'a dyn FunctionRegistry,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            catalog,
            functions,
            config,
        }
    }

    /// Build a source node from a catalog entry.
    ///
    /// The catalog schema is aliased and gets `ROWTIME` / `ROWKEY`
    /// projected into its value columns; the key field is the catalog's
    /// declared key, qualified by the alias.
    pub fn source(
        &self,
        name: &SourceName,
        alias: Option<&SourceName>,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        let source = self.catalog.source(name).ok_or_else(|| {
            RapidsError::unknown_source(format!(
                "'{}' is not registered; known sources: [{}]",
                name,
                self.catalog.source_names().join(", ")
            ))
        })?;

        let alias = alias.cloned().unwrap_or_else(|| name.clone());
        let schema = source
            .schema()
            .with_alias(&alias)?
            .with_meta_and_key_cols_in_value();
        let key_field = source.key_field().with_source(&alias);
        key_field.validate(&schema)?;

        tracing::debug!(source = %name, alias = %alias, "planning source");

        Ok(PlanNode::DataSource {
            source,
            alias,
            schema,
            key_field,
            context: stacker.push("Source").query_context(),
        })
    }

    /// Build a filter node over a boolean predicate.
    ///
    /// Row-time literal normalization is applied before type checking.
    pub fn filter(
        &self,
        input: PlanNode,
        predicate: Expression,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        let predicate = rewrite_rowtime(&predicate)?;

        let resolver = TypeResolver::new(input.schema(), self.functions);
        match resolver.resolve_opt(&predicate)? {
            None | Some(SqlType::Boolean) => {}
            Some(t) => {
                return Err(RapidsError::type_mismatch(format!(
                    "filter predicate {} must be BOOLEAN, is {}",
                    predicate, t
                )))
            }
        }

        Ok(PlanNode::Filter {
            schema: input.schema().clone(),
            key_field: input.key_field().clone(),
            context: stacker.push("Filter").query_context(),
            input: Arc::new(input),
            predicate,
        })
    }

    /// Build a projection node.
    ///
    /// Key columns are carried through; value columns are named by the
    /// select list and typed by inference. The key field survives only when
    /// the projection re-selects it (and not under the `ROWTIME` / `ROWKEY`
    /// names).
    pub fn project(
        &self,
        input: PlanNode,
        selects: Vec<SelectExpression>,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        let resolver = TypeResolver::new(input.schema(), self.functions);

        // Projection outputs are bare names; the carried key columns drop
        // their qualifier with them.
        let mut builder = LogicalSchema::builder()
            .key_columns(input.schema().key().iter().map(Column::without_source));
        for select in &selects {
            let sql_type = resolver.resolve(&select.expression)?;
            builder = builder.value_column(select.name.clone(), sql_type);
        }
        let schema = builder.build()?;

        let key_field = self.projected_key_field(&input, &selects);
        key_field.validate(&schema)?;

        Ok(PlanNode::Project {
            schema,
            key_field,
            context: stacker.push("Project").query_context(),
            input: Arc::new(input),
            selects,
        })
    }

    fn projected_key_field(&self, input: &PlanNode, selects: &[SelectExpression]) -> KeyField {
        let Some(key_column) = input.key_field().resolve(input.schema()) else {
            return KeyField::none();
        };

        for select in selects {
            let Some(column) = select.expression.as_column_ref() else {
                continue;
            };
            if !key_column.matches(&column.qualified_name()) {
                continue;
            }
            // The implicit columns never become the key field.
            if select.name.is_rowtime() || select.name.is_rowkey() {
                continue;
            }
            // Legacy semantics do not track renames.
            if self.config.legacy_key_field_semantics && select.name != *key_column.name() {
                continue;
            }
            return KeyField::of(select.name.clone());
        }

        KeyField::none()
    }

    /// Build a grouping node, inserting a repartition step when the
    /// grouping expressions do not match the current key.
    pub fn group_by(
        &self,
        input: PlanNode,
        expressions: Vec<Expression>,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        if expressions.is_empty() {
            return Err(RapidsError::invalid_argument(
                "GROUP BY requires at least one expression".to_string(),
            ));
        }

        let resolver = TypeResolver::new(input.schema(), self.functions);
        for expression in &expressions {
            resolver.resolve(expression)?;
        }

        let schema = input.schema().clone();

        if !self.rekey_required(&input, &expressions) {
            let key_field = input.key_field().clone();
            return Ok(PlanNode::GroupBy {
                schema,
                key_field,
                context: stacker.push("GroupBy").query_context(),
                input: Arc::new(input),
                expressions,
            });
        }

        let synthetic = grouped_key_name(&expressions);
        let key_field = input
            .schema()
            .find_value_column(&synthetic)
            .map(|c| KeyField::of(c.name().clone()))
            .unwrap_or_else(KeyField::none);

        tracing::debug!(key = %synthetic, "group-by requires repartitioning");

        let repartition = PlanNode::Repartition {
            schema: schema.clone(),
            key_field: key_field.clone(),
            context: stacker.push("GroupBy").push("Repartition").query_context(),
            input: Arc::new(input),
            partition_by: expressions.clone(),
        };

        Ok(PlanNode::GroupBy {
            schema,
            key_field,
            context: stacker.push("GroupBy").query_context(),
            input: Arc::new(repartition),
            expressions,
        })
    }

    /// Re-keying is unnecessary only for a single column reference that is
    /// already the partition key: `ROWKEY` itself, or the current key
    /// field. Legacy semantics repartition even on `ROWKEY`.
    fn rekey_required(&self, input: &PlanNode, expressions: &[Expression]) -> bool {
        if expressions.len() != 1 {
            return true;
        }
        let Some(column) = expressions[0].as_column_ref() else {
            return true;
        };

        if !self.config.legacy_key_field_semantics && column.is_rowkey() {
            return false;
        }

        let Some(key_column) = input.key_field().resolve(input.schema()) else {
            return true;
        };
        !key_column.matches(&column.qualified_name())
    }

    /// Build an aggregation node over a grouped input.
    ///
    /// `output_schema` must carry exactly the group-key columns followed by
    /// one column per aggregation.
    pub fn aggregate(
        &self,
        grouped: PlanNode,
        output_schema: LogicalSchema,
        non_func_column_count: usize,
        aggregations: Vec<Expression>,
        window: Option<WindowType>,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        let expected = non_func_column_count + aggregations.len();
        let actual = output_schema.value().len();
        if expected != actual {
            return Err(RapidsError::schema_arity(format!(
                "aggregate schema value column count does not match. expected: {}, actual: {}, schema: {}",
                expected, actual, output_schema
            )));
        }

        let resolver = TypeResolver::new(grouped.schema(), self.functions);
        for aggregation in &aggregations {
            let Expression::FunctionCall { name, .. } = aggregation else {
                return Err(RapidsError::type_mismatch(format!(
                    "expected an aggregate function call, got {}",
                    aggregation
                )));
            };
            if !self.functions.is_aggregate(name) {
                return Err(RapidsError::type_mismatch(format!(
                    "{} is not an aggregate function",
                    name
                )));
            }
            resolver.resolve(aggregation)?;
        }

        let key_field = grouped.key_field().clone();
        key_field.validate(&output_schema)?;

        let context = stacker.push("Aggregate").query_context();

        match window {
            Some(window) => {
                window.validate()?;
                Ok(PlanNode::WindowedAggregate {
                    input: Arc::new(grouped),
                    non_func_column_count,
                    aggregations,
                    key_window: self.key_encoding_window(window),
                    window,
                    schema: output_schema,
                    key_field,
                    context,
                })
            }
            None => Ok(PlanNode::Aggregate {
                input: Arc::new(grouped),
                non_func_column_count,
                aggregations,
                schema: output_schema,
                key_field,
                context,
            }),
        }
    }

    /// Queries started before the session-key migration encode session
    /// keys with a maximum-duration tumbling window.
    fn key_encoding_window(&self, window: WindowType) -> WindowType {
        if window.is_session() && self.config.windowed_session_key_legacy {
            WindowType::Tumbling { size_ms: u64::MAX }
        } else {
            window
        }
    }

    /// Re-key a stream on a value column.
    ///
    /// A no-op when the stream is already keyed as requested; re-keying on
    /// a metadata column leaves no value column mirroring the key.
    pub fn partition_by(
        &self,
        input: PlanNode,
        column: ColumnName,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        let proposed = input
            .schema()
            .find_value_column(column.as_str())
            .ok_or_else(|| {
                RapidsError::unknown_column_with_suggestions(
                    column.as_str(),
                    &input.schema().value_column_names(),
                )
            })?;
        let proposed_bare = proposed.name().clone();
        let proposed_is_meta = input.schema().is_meta_column(proposed_bare.as_str());

        let names_match = input
            .key_field()
            .resolve(input.schema())
            .map(|key_column| key_column.matches(column.as_str()))
            .unwrap_or(false);

        let treat_as_row_key =
            !self.config.legacy_key_field_semantics && proposed_bare.is_rowkey();

        if names_match {
            return input.with_key_field(KeyField::of(column));
        }
        if treat_as_row_key {
            return Ok(input);
        }

        let key_field = if proposed_is_meta {
            KeyField::none()
        } else {
            KeyField::of(column.clone())
        };

        Ok(PlanNode::Repartition {
            schema: input.schema().clone(),
            key_field,
            context: stacker.push("Repartition").query_context(),
            input: Arc::new(input),
            partition_by: vec![Expression::ColumnRef(column.as_str().into())],
        })
    }

    /// Build a join over two planned sources.
    pub fn join(
        &self,
        left: PlanNode,
        right: PlanNode,
        params: JoinParams,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        plan_join(self, left, right, params, stacker)
    }

    /// Build a terminal sink node.
    pub fn sink(
        &self,
        input: PlanNode,
        topic: impl Into<String>,
        value_format: Format,
        stacker: &Stacker,
    ) -> Result<PlanNode> {
        Ok(PlanNode::Sink {
            schema: input.schema().clone(),
            key_field: input.key_field().clone(),
            context: stacker.push("Sink").query_context(),
            input: Arc::new(input),
            topic: topic.into(),
            value_format,
        })
    }
}

/// The synthetic key name for a set of grouping expressions.
pub fn grouped_key_name(expressions: &[Expression]) -> String {
    expressions
        .iter()
        .map(Expression::to_string)
        .collect::<Vec<_>>()
        .join(GROUP_BY_COLUMN_SEPARATOR)
}
