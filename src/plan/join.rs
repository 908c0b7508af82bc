//! Join planning.
//!
//! The joiner is selected by the (left, right) node-type pair; anything
//! outside the supported matrix is rejected. Both sides must be
//! co-partitioned, stream sides are re-keyed onto the join field when
//! needed, and table sides must already be keyed by it.

use std::sync::Arc;

use crate::error::{RapidsError, Result};
use crate::plan::builder::PlanBuilder;
use crate::plan::context::Stacker;
use crate::plan::key_field::KeyField;
use crate::plan::node::{JoinType, PlanNode};
use crate::plan::window::WithinExpression;
use crate::plan::NodeType;
use crate::schema::{ColumnName, LogicalSchema, SourceName, ROWKEY_NAME};

/// The resolved join criterion and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinParams {
    pub join_type: JoinType,
    /// The single left-side value column named by the criterion
    pub left_field: ColumnName,
    /// The single right-side value column named by the criterion
    pub right_field: ColumnName,
    /// The WITHIN bound; required for stream-stream, forbidden otherwise
    pub within: Option<WithinExpression>,
}

impl JoinParams {
    /// An un-windowed join.
    pub fn new(join_type: JoinType, left_field: ColumnName, right_field: ColumnName) -> Self {
        Self {
            join_type,
            left_field,
            right_field,
            within: None,
        }
    }

    /// Attach a WITHIN window.
    pub fn within(mut self, within: WithinExpression) -> Self {
        self.within = Some(within);
        self
    }
}

pub(crate) fn plan_join(
    builder: &PlanBuilder<'_>,
    left: PlanNode,
    right: PlanNode,
    params: JoinParams,
    stacker: &Stacker,
) -> Result<PlanNode> {
    ensure_matching_partition_counts(&left, &right)?;

    resolve_join_field(&left, &params.left_field)?;
    resolve_join_field(&right, &params.right_field)?;

    match (left.node_type(), right.node_type()) {
        (NodeType::Stream, NodeType::Stream) => {
            stream_stream_join(builder, left, right, params, stacker)
        }
        (NodeType::Stream, NodeType::Table) => {
            stream_table_join(builder, left, right, params, stacker)
        }
        (NodeType::Table, NodeType::Table) => table_table_join(left, right, params, stacker),
        (left_type, right_type) => Err(RapidsError::join_combination(format!(
            "join between invalid operands requested: left type: {:?}, right type: {:?}",
            left_type, right_type
        ))),
    }
}

fn stream_stream_join(
    builder: &PlanBuilder<'_>,
    left: PlanNode,
    right: PlanNode,
    params: JoinParams,
    stacker: &Stacker,
) -> Result<PlanNode> {
    let Some(within) = params.within else {
        return Err(RapidsError::within_required(
            "stream-stream joins must have a WITHIN clause specified".to_string(),
        ));
    };

    let left = repartition_stream(builder, left, &params.left_field, stacker, "PrepareLeft")?;
    let right = repartition_stream(builder, right, &params.right_field, stacker, "PrepareRight")?;

    let key_field = joined_key_field(&left, params.join_type);
    let schema = join_schema(&left, &right)?;
    key_field.validate(&schema)?;

    Ok(PlanNode::StreamStreamJoin {
        left: Arc::new(left),
        right: Arc::new(right),
        join_type: params.join_type,
        left_join_field: params.left_field,
        right_join_field: params.right_field,
        window: within.join_window(),
        schema,
        key_field,
        context: stacker.push("Join").query_context(),
    })
}

fn stream_table_join(
    builder: &PlanBuilder<'_>,
    left: PlanNode,
    right: PlanNode,
    params: JoinParams,
    stacker: &Stacker,
) -> Result<PlanNode> {
    reject_within(&params, "stream-table")?;

    if params.join_type == JoinType::Outer {
        return Err(RapidsError::join_combination(
            "full outer joins between streams and tables are not supported".to_string(),
        ));
    }

    check_table_keyed_by(&right, &params.right_field)?;
    let left = repartition_stream(builder, left, &params.left_field, stacker, "PrepareLeft")?;

    let key_field = joined_key_field(&left, params.join_type);
    let schema = join_schema(&left, &right)?;
    key_field.validate(&schema)?;

    Ok(PlanNode::StreamTableJoin {
        left: Arc::new(left),
        right: Arc::new(right),
        join_type: params.join_type,
        left_join_field: params.left_field,
        right_join_field: params.right_field,
        schema,
        key_field,
        context: stacker.push("Join").query_context(),
    })
}

fn table_table_join(
    left: PlanNode,
    right: PlanNode,
    params: JoinParams,
    stacker: &Stacker,
) -> Result<PlanNode> {
    reject_within(&params, "table-table")?;

    check_table_keyed_by(&left, &params.left_field)?;
    check_table_keyed_by(&right, &params.right_field)?;

    let key_field = joined_key_field(&left, params.join_type);
    let schema = join_schema(&left, &right)?;
    key_field.validate(&schema)?;

    Ok(PlanNode::TableTableJoin {
        left: Arc::new(left),
        right: Arc::new(right),
        join_type: params.join_type,
        left_join_field: params.left_field,
        right_join_field: params.right_field,
        schema,
        key_field,
        context: stacker.push("Join").query_context(),
    })
}

fn reject_within(params: &JoinParams, kind: &str) -> Result<()> {
    if params.within.is_some() {
        return Err(RapidsError::within_forbidden(format!(
            "a window definition was provided for a {} join; these joins are not windowed",
            kind
        )));
    }
    Ok(())
}

fn ensure_matching_partition_counts(left: &PlanNode, right: &PlanNode) -> Result<()> {
    let left_count = left.source_partition_count()?;
    let right_count = right.source_partition_count()?;
    if left_count != right_count {
        return Err(RapidsError::partition_count(format!(
            "cannot join sources with differing partition counts: {} vs {}; \
             repartition either side so the counts match",
            left_count, right_count
        )));
    }
    Ok(())
}

fn resolve_join_field(side: &PlanNode, field: &ColumnName) -> Result<()> {
    side.schema()
        .find_value_column(field.as_str())
        .map(|_| ())
        .ok_or_else(|| {
            RapidsError::unknown_column_with_suggestions(
                field.as_str(),
                &side.schema().value_column_names(),
            )
        })
}

/// Re-key a stream side onto its join field, unless it already is.
fn repartition_stream(
    builder: &PlanBuilder<'_>,
    node: PlanNode,
    field: &ColumnName,
    stacker: &Stacker,
    segment: &str,
) -> Result<PlanNode> {
    builder.partition_by(node, field.clone(), &stacker.push(segment))
}

/// A table side must already be keyed by the join field or by `ROWKEY`.
fn check_table_keyed_by(table: &PlanNode, field: &ColumnName) -> Result<()> {
    let key_column = table.key_field().resolve(table.schema());

    let names_match = key_column
        .map(|column| column.matches(field.as_str()))
        .unwrap_or(false);
    if names_match || bare_name(field.as_str()) == ROWKEY_NAME {
        return Ok(());
    }

    let table_name = table
        .source_alias()
        .map(SourceName::to_string)
        .unwrap_or_else(|| "table".to_string());

    match key_column {
        None => Err(RapidsError::table_join_key(format!(
            "source table ({}) has no key column defined; only '{}' is supported in the join criteria",
            table_name, ROWKEY_NAME
        ))),
        Some(column) => Err(RapidsError::table_join_key(format!(
            "source table ({}) key column ({}) is not the column used in the join criteria ({})",
            table_name,
            column.full_name(),
            field
        ))),
    }
}

/// For INNER and LEFT joins the result is keyed by the left side's key
/// field (`ROWKEY` when absent), qualified by the left alias. OUTER joins
/// track no key field: either side of the output may be null.
fn joined_key_field(left: &PlanNode, join_type: JoinType) -> KeyField {
    if join_type == JoinType::Outer {
        return KeyField::none();
    }

    let name = left
        .key_field()
        .name()
        .cloned()
        .unwrap_or_else(ColumnName::rowkey);
    let key_field = KeyField::of(name);

    match left.source_alias() {
        Some(alias) => key_field.with_source(alias),
        None => key_field,
    }
}

/// `[ROWKEY STRING KEY]` followed by the left then right value columns.
fn join_schema(left: &PlanNode, right: &PlanNode) -> Result<LogicalSchema> {
    LogicalSchema::builder()
        .value_columns(left.schema().value().iter().cloned())
        .value_columns(right.schema().value().iter().cloned())
        .build()
}

fn bare_name(name: &str) -> &str {
    match name.split_once('.') {
        Some((_, bare)) => bare,
        None => name,
    }
}
