//! Runtime parameters of an aggregation node.
//!
//! The planner hands these to the runtime collaborator: an initializer, an
//! accumulator, a merger for session windows, and a result mapper that
//! prepends the group-key columns to the aggregate output row.

use std::sync::Arc;

use crate::codegen::{CodeGen, CompiledExpression};
use crate::error::{RapidsError, Result};
use crate::expr::{Expression, TypeResolver};
use crate::function::{Aggregator, FunctionRegistry};
use crate::plan::window::WindowSelector;
use crate::schema::{FunctionName, LogicalSchema};
use crate::types::{Row, SqlType, Value};

struct AggregateSite {
    name: FunctionName,
    aggregator: Arc<dyn Aggregator>,
    /// Compiled argument; `None` for zero-argument calls like `COUNT(*)`.
    argument: Option<CompiledExpression>,
}

/// The executable surface of an [`Aggregate`](crate::plan::PlanNode::Aggregate)
/// or windowed aggregate node.
pub struct AggregateParams {
    non_func_column_count: usize,
    sites: Vec<AggregateSite>,
    window_selector: WindowSelector,
}

impl AggregateParams {
    /// Resolve and compile the aggregation calls against the grouped
    /// input's schema.
    pub fn new(
        schema: &LogicalSchema,
        non_func_column_count: usize,
        aggregations: &[Expression],
        functions: &dyn FunctionRegistry,
    ) -> Result<Self> {
        let resolver = TypeResolver::new(schema, functions);
        let codegen = CodeGen::new(schema, functions);

        let mut sites = Vec::with_capacity(aggregations.len());
        for aggregation in aggregations {
            let Expression::FunctionCall { name, args } = aggregation else {
                return Err(RapidsError::type_mismatch(format!(
                    "expected an aggregate function call, got {}",
                    aggregation
                )));
            };
            if !functions.is_aggregate(name) {
                return Err(RapidsError::type_mismatch(format!(
                    "{} is not an aggregate function",
                    name
                )));
            }

            let arg_type = match args.first() {
                Some(arg) => resolver.resolve_opt(arg)?.unwrap_or(SqlType::Bigint),
                None => SqlType::Bigint,
            };
            let descriptor = functions.aggregate(name, &arg_type)?;

            let argument = args.first().map(|arg| codegen.compile(arg)).transpose()?;

            sites.push(AggregateSite {
                name: descriptor.name().clone(),
                aggregator: descriptor.instantiate(),
                argument,
            });
        }

        let window_selector = WindowSelector::from_aggregations(
            non_func_column_count,
            sites.iter().map(|site| &site.name),
        );

        Ok(Self {
            non_func_column_count,
            sites,
            window_selector,
        })
    }

    /// Number of group-key columns prepended to each result row.
    pub fn non_func_column_count(&self) -> usize {
        self.non_func_column_count
    }

    /// Number of aggregation slots.
    pub fn aggregate_count(&self) -> usize {
        self.sites.len()
    }

    /// The initial accumulator row (aggregation slots only).
    pub fn init(&self) -> Row {
        Row::new(self.sites.iter().map(|site| site.aggregator.init()).collect())
    }

    /// Fold one input row into the accumulator row.
    pub fn accumulate(&self, accumulator: &Row, input: &Row) -> Result<Row> {
        let mut next = Vec::with_capacity(self.sites.len());
        for (i, site) in self.sites.iter().enumerate() {
            let current = accumulator
                .column(i)
                .ok_or_else(|| RapidsError::internal("accumulator row too short".to_string()))?;
            let value = match &site.argument {
                Some(argument) => argument.evaluate(input)?,
                // Zero-argument aggregates count the row itself.
                None => Value::Boolean(true),
            };
            next.push(site.aggregator.accumulate(current, &value));
        }
        Ok(Row::new(next))
    }

    /// Combine two accumulator rows; used when session windows merge.
    pub fn merge(&self, left: &Row, right: &Row) -> Result<Row> {
        let mut merged = Vec::with_capacity(self.sites.len());
        for (i, site) in self.sites.iter().enumerate() {
            let (Some(l), Some(r)) = (left.column(i), right.column(i)) else {
                return Err(RapidsError::internal(
                    "accumulator rows too short to merge".to_string(),
                ));
            };
            merged.push(site.aggregator.merge(l, r));
        }
        Ok(Row::new(merged))
    }

    /// Build the output row: group-key columns first, then the
    /// aggregation results.
    pub fn map_result(&self, group_values: &[Value], accumulator: &Row) -> Row {
        let mut columns = Vec::with_capacity(group_values.len() + accumulator.len());
        columns.extend_from_slice(group_values);
        columns.extend_from_slice(accumulator.columns());
        Row::new(columns)
    }

    /// The window-boundary post-transform for this aggregation.
    pub fn window_selector(&self) -> &WindowSelector {
        &self.window_selector
    }
}
