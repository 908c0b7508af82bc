//! Runtime value representation for Rapids.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{RapidsError, Result};
use crate::types::SqlType;

/// A single nullable runtime value.
///
/// Rows on the wire are ordered lists of these; compiled expressions
/// produce and consume them.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null of any type
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Bigint(i64),
    /// 64-bit floating point
    Double(f64),
    /// Fixed-point decimal: unscaled digits plus precision and scale
    Decimal {
        unscaled: i128,
        precision: u8,
        scale: u8,
    },
    /// UTF-8 string
    String(String),
    /// Ordered collection
    Array(Vec<Value>),
    /// String-keyed map, entry-ordered
    Map(Vec<(String, Value)>),
    /// Ordered named fields
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Create a decimal value from unscaled digits.
    pub fn decimal(unscaled: i128, precision: u8, scale: u8) -> Self {
        Value::Decimal {
            unscaled,
            precision,
            scale,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the SQL type of this value, if known.
    ///
    /// `Null` carries no type; containers infer from their first element
    /// and fall back to STRING for empties.
    pub fn data_type(&self) -> Option<SqlType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(SqlType::Boolean),
            Value::Integer(_) => Some(SqlType::Integer),
            Value::Bigint(_) => Some(SqlType::Bigint),
            Value::Double(_) => Some(SqlType::Double),
            Value::Decimal {
                precision, scale, ..
            } => Some(SqlType::Decimal {
                precision: *precision,
                scale: *scale,
            }),
            Value::String(_) => Some(SqlType::String),
            Value::Array(items) => {
                let element = items
                    .first()
                    .and_then(Value::data_type)
                    .unwrap_or(SqlType::String);
                Some(SqlType::array(element))
            }
            Value::Map(entries) => {
                let value = entries
                    .first()
                    .and_then(|(_, v)| v.data_type())
                    .unwrap_or(SqlType::String);
                Some(SqlType::map(value))
            }
            Value::Struct(fields) => Some(SqlType::Struct(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.data_type().unwrap_or(SqlType::String)))
                    .collect(),
            )),
        }
    }

    /// Try to read this value as an `i64`, widening smaller integers.
    pub fn try_as_i64(&self) -> Result<Option<i64>> {
        match self {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v as i64)),
            Value::Bigint(v) => Ok(Some(*v)),
            _ => Err(RapidsError::type_mismatch(format!(
                "cannot read {} as BIGINT",
                self.type_name()
            ))),
        }
    }

    /// Try to read this value as an `f64`, widening any numeric.
    pub fn try_as_f64(&self) -> Result<Option<f64>> {
        match self {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v as f64)),
            Value::Bigint(v) => Ok(Some(*v as f64)),
            Value::Double(v) => Ok(Some(*v)),
            Value::Decimal {
                unscaled, scale, ..
            } => Ok(Some(*unscaled as f64 / 10f64.powi(*scale as i32))),
            _ => Err(RapidsError::type_mismatch(format!(
                "cannot read {} as DOUBLE",
                self.type_name()
            ))),
        }
    }

    /// Try to read this value as a string.
    pub fn try_as_str(&self) -> Result<Option<&str>> {
        match self {
            Value::Null => Ok(None),
            Value::String(v) => Ok(Some(v)),
            _ => Err(RapidsError::type_mismatch(format!(
                "cannot read {} as STRING",
                self.type_name()
            ))),
        }
    }

    /// Try to read this value as a boolean.
    pub fn try_as_bool(&self) -> Result<Option<bool>> {
        match self {
            Value::Null => Ok(None),
            Value::Boolean(v) => Ok(Some(*v)),
            _ => Err(RapidsError::type_mismatch(format!(
                "cannot read {} as BOOLEAN",
                self.type_name()
            ))),
        }
    }

    /// Render the value the way a record key is rendered: strings bare,
    /// everything else via its display form.
    pub fn to_key_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Bigint(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal { .. } => "DECIMAL",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Map(_) => "MAP",
            Value::Struct(_) => "STRUCT",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Bigint(a), Value::Bigint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (
                Value::Decimal {
                    unscaled: u1,
                    precision: p1,
                    scale: s1,
                },
                Value::Decimal {
                    unscaled: u2,
                    precision: p2,
                    scale: s2,
                },
            ) => u1 == u2 && p1 == p2 && s1 == s2,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Bigint(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Decimal {
                unscaled,
                precision,
                scale,
            } => {
                unscaled.hash(state);
                precision.hash(state);
                scale.hash(state);
            }
            Value::String(v) => v.hash(state),
            Value::Array(v) => v.hash(state),
            Value::Map(v) | Value::Struct(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Bigint(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal {
                unscaled, scale, ..
            } => {
                let scale = *scale as usize;
                if scale == 0 {
                    write!(f, "{}", unscaled)
                } else {
                    let digits = format!("{:0>width$}", unscaled.abs(), width = scale + 1);
                    let (int, frac) = digits.split_at(digits.len() - scale);
                    if *unscaled < 0 {
                        write!(f, "-{}.{}", int, frac)
                    } else {
                        write!(f, "{}.{}", int, frac)
                    }
                }
            }
            Value::String(v) => write!(f, "'{}'", v),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) | Value::Struct(entries) => {
                write!(f, "{{")?;
                for (i, (name, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Bigint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// An ordered list of nullable column values.
///
/// A row is always sized to the value-column count of the schema it was
/// produced against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Vec<Value>,
}

impl Row {
    /// Create a row from column values.
    pub fn new(columns: Vec<Value>) -> Self {
        Self { columns }
    }

    /// Create a row of `len` nulls.
    pub fn nulls(len: usize) -> Self {
        Self {
            columns: vec![Value::Null; len],
        }
    }

    /// Get a column value by position.
    pub fn column(&self, index: usize) -> Option<&Value> {
        self.columns.get(index)
    }

    /// Replace a column value by position.
    pub fn set_column(&mut self, index: usize, value: Value) {
        self.columns[index] = value;
    }

    /// Number of columns in this row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All column values in order.
    pub fn columns(&self) -> &[Value] {
        &self.columns
    }

    /// Consume the row, yielding its column values.
    pub fn into_columns(self) -> Vec<Value> {
        self.columns
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}
