//! Plan-node tree.

use std::fmt;
use std::sync::Arc;

use crate::catalog::{Format, Source};
use crate::error::{RapidsError, Result};
use crate::expr::Expression;
use crate::plan::context::QueryContext;
use crate::plan::key_field::KeyField;
use crate::plan::window::{JoinWindow, WindowType};
use crate::plan::NodeType;
use crate::schema::{ColumnName, FormatOptions, LogicalSchema, SourceName};

/// How two sources are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Outer,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Outer => write!(f, "OUTER"),
        }
    }
}

/// One projected output column: its name and defining expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpression {
    pub name: ColumnName,
    pub expression: Expression,
}

impl SelectExpression {
    pub fn new(name: ColumnName, expression: Expression) -> Self {
        Self { name, expression }
    }
}

impl fmt::Display for SelectExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.expression, self.name)
    }
}

/// A node of the logical dataflow plan.
///
/// Every node carries its output schema, output key field, and the query
/// context path used for deterministic naming. Nodes are immutable values;
/// the tree shares subtrees through `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Read a stream or table from its topic
    DataSource {
        source: Arc<Source>,
        alias: SourceName,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Map rows to a new column list
    Project {
        input: Arc<PlanNode>,
        selects: Vec<SelectExpression>,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Drop rows failing a boolean predicate
    Filter {
        input: Arc<PlanNode>,
        predicate: Expression,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Re-key rows by one or more expressions
    Repartition {
        input: Arc<PlanNode>,
        partition_by: Vec<Expression>,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Group rows by expressions, ready for aggregation
    GroupBy {
        input: Arc<PlanNode>,
        expressions: Vec<Expression>,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Aggregate a grouped input
    Aggregate {
        input: Arc<PlanNode>,
        non_func_column_count: usize,
        aggregations: Vec<Expression>,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Aggregate a grouped input over time windows
    WindowedAggregate {
        input: Arc<PlanNode>,
        non_func_column_count: usize,
        aggregations: Vec<Expression>,
        window: WindowType,
        /// Window info used to encode the record key; differs from
        /// `window` only under the legacy session-key configuration
        key_window: WindowType,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Join two streams within a time bound
    StreamStreamJoin {
        left: Arc<PlanNode>,
        right: Arc<PlanNode>,
        join_type: JoinType,
        left_join_field: ColumnName,
        right_join_field: ColumnName,
        window: JoinWindow,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Enrich a stream against a table
    StreamTableJoin {
        left: Arc<PlanNode>,
        right: Arc<PlanNode>,
        join_type: JoinType,
        left_join_field: ColumnName,
        right_join_field: ColumnName,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Join two tables
    TableTableJoin {
        left: Arc<PlanNode>,
        right: Arc<PlanNode>,
        join_type: JoinType,
        left_join_field: ColumnName,
        right_join_field: ColumnName,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },

    /// Write rows to a target topic; terminal
    Sink {
        input: Arc<PlanNode>,
        topic: String,
        value_format: Format,
        schema: LogicalSchema,
        key_field: KeyField,
        context: QueryContext,
    },
}

impl PlanNode {
    /// The node's output schema.
    pub fn schema(&self) -> &LogicalSchema {
        match self {
            PlanNode::DataSource { schema, .. }
            | PlanNode::Project { schema, .. }
            | PlanNode::Filter { schema, .. }
            | PlanNode::Repartition { schema, .. }
            | PlanNode::GroupBy { schema, .. }
            | PlanNode::Aggregate { schema, .. }
            | PlanNode::WindowedAggregate { schema, .. }
            | PlanNode::StreamStreamJoin { schema, .. }
            | PlanNode::StreamTableJoin { schema, .. }
            | PlanNode::TableTableJoin { schema, .. }
            | PlanNode::Sink { schema, .. } => schema,
        }
    }

    /// The node's output key field.
    pub fn key_field(&self) -> &KeyField {
        match self {
            PlanNode::DataSource { key_field, .. }
            | PlanNode::Project { key_field, .. }
            | PlanNode::Filter { key_field, .. }
            | PlanNode::Repartition { key_field, .. }
            | PlanNode::GroupBy { key_field, .. }
            | PlanNode::Aggregate { key_field, .. }
            | PlanNode::WindowedAggregate { key_field, .. }
            | PlanNode::StreamStreamJoin { key_field, .. }
            | PlanNode::StreamTableJoin { key_field, .. }
            | PlanNode::TableTableJoin { key_field, .. }
            | PlanNode::Sink { key_field, .. } => key_field,
        }
    }

    /// The node's naming context.
    pub fn context(&self) -> &QueryContext {
        match self {
            PlanNode::DataSource { context, .. }
            | PlanNode::Project { context, .. }
            | PlanNode::Filter { context, .. }
            | PlanNode::Repartition { context, .. }
            | PlanNode::GroupBy { context, .. }
            | PlanNode::Aggregate { context, .. }
            | PlanNode::WindowedAggregate { context, .. }
            | PlanNode::StreamStreamJoin { context, .. }
            | PlanNode::StreamTableJoin { context, .. }
            | PlanNode::TableTableJoin { context, .. }
            | PlanNode::Sink { context, .. } => context,
        }
    }

    /// Whether this node produces a stream or a table.
    pub fn node_type(&self) -> NodeType {
        match self {
            PlanNode::DataSource { source, .. } => source.node_type(),
            PlanNode::Project { input, .. }
            | PlanNode::Filter { input, .. }
            | PlanNode::Repartition { input, .. }
            | PlanNode::Sink { input, .. } => input.node_type(),
            PlanNode::GroupBy { .. }
            | PlanNode::Aggregate { .. }
            | PlanNode::WindowedAggregate { .. }
            | PlanNode::TableTableJoin { .. } => NodeType::Table,
            PlanNode::StreamStreamJoin { .. } | PlanNode::StreamTableJoin { .. } => {
                NodeType::Stream
            }
        }
    }

    /// The node's inputs, left to right.
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::DataSource { .. } => vec![],
            PlanNode::Project { input, .. }
            | PlanNode::Filter { input, .. }
            | PlanNode::Repartition { input, .. }
            | PlanNode::GroupBy { input, .. }
            | PlanNode::Aggregate { input, .. }
            | PlanNode::WindowedAggregate { input, .. }
            | PlanNode::Sink { input, .. } => vec![input.as_ref()],
            PlanNode::StreamStreamJoin { left, right, .. }
            | PlanNode::StreamTableJoin { left, right, .. }
            | PlanNode::TableTableJoin { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }

    /// A copy of this node tracking a different key field.
    ///
    /// The new key field must satisfy the schema invariant.
    pub fn with_key_field(&self, key_field: KeyField) -> Result<PlanNode> {
        key_field.validate(self.schema())?;
        let mut node = self.clone();
        match &mut node {
            PlanNode::DataSource { key_field: kf, .. }
            | PlanNode::Project { key_field: kf, .. }
            | PlanNode::Filter { key_field: kf, .. }
            | PlanNode::Repartition { key_field: kf, .. }
            | PlanNode::GroupBy { key_field: kf, .. }
            | PlanNode::Aggregate { key_field: kf, .. }
            | PlanNode::WindowedAggregate { key_field: kf, .. }
            | PlanNode::StreamStreamJoin { key_field: kf, .. }
            | PlanNode::StreamTableJoin { key_field: kf, .. }
            | PlanNode::TableTableJoin { key_field: kf, .. }
            | PlanNode::Sink { key_field: kf, .. } => *kf = key_field,
        }
        Ok(node)
    }

    /// The partition count of the topic feeding this node.
    ///
    /// Joins inherit the right side's count, matching the co-partitioning
    /// requirement checked at join construction.
    pub fn source_partition_count(&self) -> Result<u32> {
        match self {
            PlanNode::DataSource { source, .. } => Ok(source.partition_count()),
            PlanNode::StreamStreamJoin { right, .. }
            | PlanNode::StreamTableJoin { right, .. }
            | PlanNode::TableTableJoin { right, .. } => right.source_partition_count(),
            other => other
                .children()
                .first()
                .ok_or_else(|| {
                    RapidsError::internal("node without children or source".to_string())
                })?
                .source_partition_count(),
        }
    }

    /// The alias of the data source feeding this node's left-most leaf.
    pub fn source_alias(&self) -> Option<&SourceName> {
        match self {
            PlanNode::DataSource { alias, .. } => Some(alias),
            other => other.children().first().and_then(|c| c.source_alias()),
        }
    }

    /// Render the plan tree with indentation.
    pub fn display_indent(&self, indent: usize) -> String {
        let mut out = String::new();
        self.format_indent(&mut out, indent);
        out
    }

    fn format_indent(&self, out: &mut String, indent: usize) {
        let prefix = "\t".repeat(indent);
        let options = FormatOptions::default();
        let header = match self {
            PlanNode::DataSource { source, alias, .. } => {
                format!("Source: {} AS {}", source.name(), alias)
            }
            PlanNode::Project { selects, .. } => {
                let columns = selects
                    .iter()
                    .map(|s| s.name.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Project: {}", columns)
            }
            PlanNode::Filter { predicate, .. } => format!("Filter: {}", predicate),
            PlanNode::Repartition { partition_by, .. } => {
                let keys = partition_by
                    .iter()
                    .map(Expression::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Repartition: {}", keys)
            }
            PlanNode::GroupBy { expressions, .. } => {
                let groups = expressions
                    .iter()
                    .map(Expression::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("GroupBy: {}", groups)
            }
            PlanNode::Aggregate { aggregations, .. } => {
                format!("Aggregate: {} aggregation(s)", aggregations.len())
            }
            PlanNode::WindowedAggregate {
                aggregations,
                window,
                ..
            } => format!(
                "WindowedAggregate: {} aggregation(s), {}",
                aggregations.len(),
                window
            ),
            PlanNode::StreamStreamJoin {
                join_type,
                left_join_field,
                right_join_field,
                ..
            } => format!(
                "StreamStreamJoin: {} ON {} = {}",
                join_type, left_join_field, right_join_field
            ),
            PlanNode::StreamTableJoin {
                join_type,
                left_join_field,
                right_join_field,
                ..
            } => format!(
                "StreamTableJoin: {} ON {} = {}",
                join_type, left_join_field, right_join_field
            ),
            PlanNode::TableTableJoin {
                join_type,
                left_join_field,
                right_join_field,
                ..
            } => format!(
                "TableTableJoin: {} ON {} = {}",
                join_type, left_join_field, right_join_field
            ),
            PlanNode::Sink { topic, .. } => format!("Sink: {}", topic),
        };

        out.push_str(&format!(
            "{} > [ {} ] | Schema: {}\n",
            prefix,
            header,
            self.schema().to_string_opts(&options)
        ));

        for child in self.children() {
            child.format_indent(out, indent + 1);
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_indent(0))
    }
}
