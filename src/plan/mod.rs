//! Relational plan algebra over streams and tables.

mod aggregate;
mod builder;
mod context;
mod join;
mod key_field;
mod node;
mod window;

pub use aggregate::AggregateParams;
pub use builder::{grouped_key_name, PlanBuilder, GROUP_BY_COLUMN_SEPARATOR};
pub use context::{QueryContext, Stacker};
pub use join::JoinParams;
pub use key_field::KeyField;
pub use node::{JoinType, PlanNode, SelectExpression};
pub use window::{JoinWindow, WindowSelector, WindowType, WithinExpression};

/// Whether a plan node produces an append-only stream or a changelog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Append-only sequence of records
    Stream,
    /// Latest-value-per-key view
    Table,
}
