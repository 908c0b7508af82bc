//! The SQL expression algebra.
//!
//! Expressions are immutable trees, equal by structure. The `Display` form
//! is canonical: it is what synthetic column names (e.g. group-by keys) are
//! built from, so it must stay stable.

mod rewriter;
mod type_infer;

pub use rewriter::{rewrite, rewrite_rowtime, try_rewrite};
pub use type_infer::TypeResolver;

use std::fmt;

use crate::schema::{ColumnName, FunctionName, SourceName};
use crate::types::{ArithmeticOp, ComparisonOp, SqlType, Value};

/// A possibly-qualified reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Optional qualifying source
    pub source: Option<SourceName>,
    /// Column name
    pub name: ColumnName,
}

impl ColumnRef {
    /// Create an unqualified reference.
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            source: None,
            name: ColumnName::of(name),
        }
    }

    /// Create a qualified reference.
    pub fn qualified(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: Some(SourceName::of(source)),
            name: ColumnName::of(name),
        }
    }

    /// `source.name` when qualified, else `name`.
    pub fn qualified_name(&self) -> String {
        match &self.source {
            Some(source) => format!("{}.{}", source, self.name),
            None => self.name.to_string(),
        }
    }

    /// Whether this references the implicit row-time column.
    pub fn is_rowtime(&self) -> bool {
        self.name.is_rowtime()
    }

    /// Whether this references the implicit row-key column.
    pub fn is_rowkey(&self) -> bool {
        self.name.is_rowkey()
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        match name.split_once('.') {
            Some((source, column)) => Self::qualified(source, column),
            None => Self::unqualified(name),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// Unary arithmetic sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

/// One `WHEN ... THEN ...` arm of a CASE expression.
///
/// For a searched CASE the operand is a boolean condition; for a simple
/// CASE it is the value compared against the CASE operand.
#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub operand: Expression,
    pub result: Expression,
}

impl WhenClause {
    pub fn new(operand: Expression, result: Expression) -> Self {
        Self { operand, result }
    }
}

/// A SQL expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// NULL literal (type unknown, accepted anywhere)
    NullLiteral,
    /// Boolean literal
    BooleanLiteral(bool),
    /// 32-bit integer literal
    IntegerLiteral(i32),
    /// 64-bit integer literal
    LongLiteral(i64),
    /// Floating point literal
    DoubleLiteral(f64),
    /// Exact decimal literal
    DecimalLiteral {
        unscaled: i128,
        precision: u8,
        scale: u8,
    },
    /// String literal
    StringLiteral(String),
    /// Column reference
    ColumnRef(ColumnRef),
    /// Binary arithmetic
    ArithmeticBinary {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Unary plus/minus
    ArithmeticUnary { sign: Sign, expr: Box<Expression> },
    /// Binary comparison
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// AND / OR
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// NOT
    Not(Box<Expression>),
    /// IS NULL
    IsNull(Box<Expression>),
    /// IS NOT NULL
    IsNotNull(Box<Expression>),
    /// BETWEEN predicate
    Between {
        value: Box<Expression>,
        min: Box<Expression>,
        max: Box<Expression>,
        negated: bool,
    },
    /// LIKE predicate
    Like {
        value: Box<Expression>,
        pattern: Box<Expression>,
        negated: bool,
    },
    /// IN list predicate
    InList {
        value: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    /// CAST to a target type
    Cast {
        expr: Box<Expression>,
        target: SqlType,
    },
    /// ARRAY / MAP subscript
    Subscript {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// STRUCT field access
    Dereference {
        base: Box<Expression>,
        field: String,
    },
    /// Scalar or aggregate function call
    FunctionCall {
        name: FunctionName,
        args: Vec<Expression>,
    },
    /// CASE WHEN c THEN r ... [ELSE d] END
    SearchedCase {
        when_clauses: Vec<WhenClause>,
        default: Option<Box<Expression>>,
    },
    /// CASE op WHEN v THEN r ... [ELSE d] END
    SimpleCase {
        operand: Box<Expression>,
        when_clauses: Vec<WhenClause>,
        default: Option<Box<Expression>>,
    },
}

impl Expression {
    /// An unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::ColumnRef(ColumnRef::unqualified(name))
    }

    /// A qualified column reference.
    pub fn qualified_column(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ColumnRef(ColumnRef::qualified(source, name))
    }

    /// A string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringLiteral(value.into())
    }

    /// An INTEGER literal.
    pub fn integer(value: i32) -> Self {
        Self::IntegerLiteral(value)
    }

    /// A BIGINT literal.
    pub fn long(value: i64) -> Self {
        Self::LongLiteral(value)
    }

    /// A DOUBLE literal.
    pub fn double(value: f64) -> Self {
        Self::DoubleLiteral(value)
    }

    /// A BOOLEAN literal.
    pub fn boolean(value: bool) -> Self {
        Self::BooleanLiteral(value)
    }

    /// The NULL literal.
    pub fn null() -> Self {
        Self::NullLiteral
    }

    /// A function call.
    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::FunctionCall {
            name: FunctionName::of(name),
            args,
        }
    }

    fn binary_comparison(self, op: ComparisonOp, other: Expression) -> Self {
        Self::Comparison {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self = other`
    pub fn eq(self, other: Expression) -> Self {
        self.binary_comparison(ComparisonOp::Eq, other)
    }

    /// `self <> other`
    pub fn not_eq(self, other: Expression) -> Self {
        self.binary_comparison(ComparisonOp::NotEq, other)
    }

    /// `self < other`
    pub fn lt(self, other: Expression) -> Self {
        self.binary_comparison(ComparisonOp::Lt, other)
    }

    /// `self <= other`
    pub fn lt_eq(self, other: Expression) -> Self {
        self.binary_comparison(ComparisonOp::LtEq, other)
    }

    /// `self > other`
    pub fn gt(self, other: Expression) -> Self {
        self.binary_comparison(ComparisonOp::Gt, other)
    }

    /// `self >= other`
    pub fn gt_eq(self, other: Expression) -> Self {
        self.binary_comparison(ComparisonOp::GtEq, other)
    }

    /// `self AND other`
    pub fn and(self, other: Expression) -> Self {
        Self::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self OR other`
    pub fn or(self, other: Expression) -> Self {
        Self::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self <op> other`
    pub fn arithmetic(self, op: ArithmeticOp, other: Expression) -> Self {
        Self::ArithmeticBinary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Whether this expression is a column reference.
    pub fn is_column_ref(&self) -> bool {
        matches!(self, Self::ColumnRef(_))
    }

    /// The referenced column, when this is a bare column reference.
    pub fn as_column_ref(&self) -> Option<&ColumnRef> {
        match self {
            Self::ColumnRef(column) => Some(column),
            _ => None,
        }
    }

    /// Whether this expression is a literal.
    pub fn is_literal(&self) -> bool {
        self.literal_value().is_some()
    }

    /// The literal's runtime value, when this is a literal.
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            Self::NullLiteral => Some(Value::Null),
            Self::BooleanLiteral(v) => Some(Value::Boolean(*v)),
            Self::IntegerLiteral(v) => Some(Value::Integer(*v)),
            Self::LongLiteral(v) => Some(Value::Bigint(*v)),
            Self::DoubleLiteral(v) => Some(Value::Double(*v)),
            Self::DecimalLiteral {
                unscaled,
                precision,
                scale,
            } => Some(Value::decimal(*unscaled, *precision, *scale)),
            Self::StringLiteral(v) => Some(Value::String(v.clone())),
            _ => None,
        }
    }

    /// All column references in this expression, in walk order.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, columns: &mut Vec<&'a ColumnRef>) {
        match self {
            Self::ColumnRef(column) => columns.push(column),
            Self::ArithmeticBinary { left, right, .. }
            | Self::Comparison { left, right, .. }
            | Self::Logical { left, right, .. } => {
                left.collect_columns(columns);
                right.collect_columns(columns);
            }
            Self::ArithmeticUnary { expr, .. }
            | Self::Not(expr)
            | Self::IsNull(expr)
            | Self::IsNotNull(expr)
            | Self::Cast { expr, .. } => expr.collect_columns(columns),
            Self::Between {
                value, min, max, ..
            } => {
                value.collect_columns(columns);
                min.collect_columns(columns);
                max.collect_columns(columns);
            }
            Self::Like { value, pattern, .. } => {
                value.collect_columns(columns);
                pattern.collect_columns(columns);
            }
            Self::InList { value, list, .. } => {
                value.collect_columns(columns);
                for item in list {
                    item.collect_columns(columns);
                }
            }
            Self::Subscript { base, index } => {
                base.collect_columns(columns);
                index.collect_columns(columns);
            }
            Self::Dereference { base, .. } => base.collect_columns(columns),
            Self::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_columns(columns);
                }
            }
            Self::SearchedCase {
                when_clauses,
                default,
            } => {
                for clause in when_clauses {
                    clause.operand.collect_columns(columns);
                    clause.result.collect_columns(columns);
                }
                if let Some(default) = default {
                    default.collect_columns(columns);
                }
            }
            Self::SimpleCase {
                operand,
                when_clauses,
                default,
            } => {
                operand.collect_columns(columns);
                for clause in when_clauses {
                    clause.operand.collect_columns(columns);
                    clause.result.collect_columns(columns);
                }
                if let Some(default) = default {
                    default.collect_columns(columns);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullLiteral => write!(f, "NULL"),
            Self::BooleanLiteral(v) => write!(f, "{}", v),
            Self::IntegerLiteral(v) => write!(f, "{}", v),
            Self::LongLiteral(v) => write!(f, "{}", v),
            Self::DoubleLiteral(v) => write!(f, "{}", v),
            Self::DecimalLiteral {
                unscaled,
                precision,
                scale,
            } => write!(f, "{}", Value::decimal(*unscaled, *precision, *scale)),
            Self::StringLiteral(v) => write!(f, "'{}'", v),
            Self::ColumnRef(column) => write!(f, "{}", column),
            Self::ArithmeticBinary { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Self::ArithmeticUnary { sign, expr } => match sign {
                Sign::Plus => write!(f, "+{}", expr),
                Sign::Minus => write!(f, "-{}", expr),
            },
            Self::Comparison { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Self::Logical { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Self::Not(expr) => write!(f, "(NOT {})", expr),
            Self::IsNull(expr) => write!(f, "({} IS NULL)", expr),
            Self::IsNotNull(expr) => write!(f, "({} IS NOT NULL)", expr),
            Self::Between {
                value,
                min,
                max,
                negated,
            } => write!(
                f,
                "({} {}BETWEEN {} AND {})",
                value,
                if *negated { "NOT " } else { "" },
                min,
                max
            ),
            Self::Like {
                value,
                pattern,
                negated,
            } => write!(
                f,
                "({} {}LIKE {})",
                value,
                if *negated { "NOT " } else { "" },
                pattern
            ),
            Self::InList {
                value,
                list,
                negated,
            } => {
                write!(f, "({} {}IN (", value, if *negated { "NOT " } else { "" })?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "))")
            }
            Self::Cast { expr, target } => write!(f, "CAST({} AS {})", expr, target),
            Self::Subscript { base, index } => write!(f, "{}[{}]", base, index),
            Self::Dereference { base, field } => write!(f, "{}->{}", base, field),
            Self::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Self::SearchedCase {
                when_clauses,
                default,
            } => {
                write!(f, "(CASE")?;
                for clause in when_clauses {
                    write!(f, " WHEN {} THEN {}", clause.operand, clause.result)?;
                }
                if let Some(default) = default {
                    write!(f, " ELSE {}", default)?;
                }
                write!(f, " END)")
            }
            Self::SimpleCase {
                operand,
                when_clauses,
                default,
            } => {
                write!(f, "(CASE {}", operand)?;
                for clause in when_clauses {
                    write!(f, " WHEN {} THEN {}", clause.operand, clause.result)?;
                }
                if let Some(default) = default {
                    write!(f, " ELSE {}", default)?;
                }
                write!(f, " END)")
            }
        }
    }
}
