//! Logical schema model: names, columns, and key/value/metadata layout.

pub mod coerce;
mod column;
mod logical;
mod name;

pub use column::{Column, Namespace};
pub use logical::{Builder as SchemaBuilder, LogicalSchema};
pub use name::{
    needs_quotes, ColumnName, FormatOptions, FunctionName, SourceName, ROWKEY_NAME, ROWTIME_NAME,
};
