//! Type system for Rapids: SQL data types and runtime values.

mod datatype;
mod value;

pub use datatype::{ArithmeticOp, ComparisonOp, SqlType, MAX_DECIMAL_PRECISION};
pub use value::{Row, Value};
