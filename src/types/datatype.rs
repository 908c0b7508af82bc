//! SQL data type definitions for Rapids.

use std::fmt;

use crate::error::{RapidsError, Result};

/// Maximum decimal precision supported by the engine.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// SQL data types supported by Rapids.
///
/// The set is closed: every column, literal, and expression in a plan is
/// typed by exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// Boolean type
    Boolean,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Bigint,
    /// 64-bit floating point
    Double,
    /// UTF-8 encoded string
    String,
    /// Fixed-point decimal with precision and scale
    Decimal { precision: u8, scale: u8 },
    /// Ordered collection of one element type
    Array(Box<SqlType>),
    /// String-keyed map of one value type
    Map(Box<SqlType>),
    /// Ordered named fields
    Struct(Vec<(std::string::String, SqlType)>),
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Subtract => write!(f, "-"),
            Self::Multiply => write!(f, "*"),
            Self::Divide => write!(f, "/"),
            Self::Modulus => write!(f, "%"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    /// Whether this operator only tests equality (no ordering needed).
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "<>"),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

impl SqlType {
    /// Create a decimal type, validating `1 <= scale <= precision <= 38`.
    pub fn decimal(precision: u8, scale: u8) -> Result<Self> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(RapidsError::invalid_argument(format!(
                "decimal precision must be between 1 and {}, got {}",
                MAX_DECIMAL_PRECISION, precision
            )));
        }
        if scale > precision {
            return Err(RapidsError::invalid_argument(format!(
                "decimal scale {} cannot exceed precision {}",
                scale, precision
            )));
        }
        Ok(SqlType::Decimal { precision, scale })
    }

    /// Create an array type.
    pub fn array(element: SqlType) -> Self {
        SqlType::Array(Box::new(element))
    }

    /// Create a map type. Keys are always STRING.
    pub fn map(value: SqlType) -> Self {
        SqlType::Map(Box::new(value))
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::Integer | SqlType::Bigint | SqlType::Double | SqlType::Decimal { .. }
        )
    }

    /// Check if this type is an integer.
    pub fn is_integer(&self) -> bool {
        matches!(self, SqlType::Integer | SqlType::Bigint)
    }

    /// Check if this type is a decimal.
    pub fn is_decimal(&self) -> bool {
        matches!(self, SqlType::Decimal { .. })
    }

    /// Check if this type is a nested container (array, map, struct).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SqlType::Array(_) | SqlType::Map(_) | SqlType::Struct(_)
        )
    }

    /// The decimal type an integer widens to in mixed decimal arithmetic.
    ///
    /// INTEGER holds at most 10 digits, BIGINT at most 19.
    pub fn integer_as_decimal(&self) -> Option<SqlType> {
        match self {
            SqlType::Integer => Some(SqlType::Decimal {
                precision: 10,
                scale: 0,
            }),
            SqlType::Bigint => Some(SqlType::Decimal {
                precision: 19,
                scale: 0,
            }),
            _ => None,
        }
    }

    /// Whether a value of this type may be CAST to `target`.
    ///
    /// Total over all type pairs. Numerics cast among themselves, every
    /// primitive casts to STRING, STRING casts to every primitive, and
    /// containers only cast to an identical type.
    pub fn castable_to(&self, target: &SqlType) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, SqlType::String) if !a.is_container() => true,
            (SqlType::String, b) if !b.is_container() => true,
            _ => false,
        }
    }

    /// Resolve the result type of a binary arithmetic expression.
    ///
    /// Integer widths widen (64-bit wins), DOUBLE absorbs every numeric
    /// including DECIMAL, and DECIMAL promotes integers into exact
    /// arithmetic with derived precision and scale.
    pub fn resolve_arithmetic(
        left: &SqlType,
        right: &SqlType,
        op: ArithmeticOp,
    ) -> Result<SqlType> {
        use SqlType::*;

        let err = || {
            RapidsError::arithmetic_type_mismatch(format!(
                "unsupported operand types {} and {} for '{}'",
                left, right, op
            ))
        };

        match (left, right) {
            (Double, r) if r.is_numeric() => Ok(Double),
            (l, Double) if l.is_numeric() => Ok(Double),
            (Integer, Integer) => Ok(Integer),
            (Integer, Bigint) | (Bigint, Integer) | (Bigint, Bigint) => Ok(Bigint),
            (Decimal { .. }, _) | (_, Decimal { .. }) => {
                let l = left.clone().as_decimal().ok_or_else(err)?;
                let r = right.clone().as_decimal().ok_or_else(err)?;
                Ok(decimal_arithmetic(&l, &r, op))
            }
            _ => Err(err()),
        }
    }

    fn as_decimal(self) -> Option<SqlType> {
        match self {
            d @ SqlType::Decimal { .. } => Some(d),
            other => other.integer_as_decimal(),
        }
    }

    /// Whether values of the two types can be compared with `op`.
    ///
    /// Numerics cross-compare (decimals with any numeric), STRING compares
    /// only with STRING, BOOLEAN supports equality only, and containers are
    /// not comparable.
    pub fn comparable_with(&self, other: &SqlType, op: ComparisonOp) -> bool {
        use SqlType::*;
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (String, String) => true,
            (Boolean, Boolean) => op.is_equality(),
            _ => false,
        }
    }
}

fn decimal_arithmetic(left: &SqlType, right: &SqlType, op: ArithmeticOp) -> SqlType {
    let (SqlType::Decimal {
        precision: p1,
        scale: s1,
    }, SqlType::Decimal {
        precision: p2,
        scale: s2,
    }) = (left, right)
    else {
        unreachable!("operands widened to decimal before dispatch");
    };
    let (p1, s1, p2, s2) = (*p1 as u16, *s1 as u16, *p2 as u16, *s2 as u16);

    let (precision, scale) = match op {
        ArithmeticOp::Add | ArithmeticOp::Subtract => {
            let scale = s1.max(s2);
            ((p1 - s1).max(p2 - s2) + scale + 1, scale)
        }
        ArithmeticOp::Multiply => (p1 + p2 + 1, s1 + s2),
        ArithmeticOp::Divide => (p1 + 5, s1 + 6),
        ArithmeticOp::Modulus => {
            let scale = s1.max(s2);
            ((p1 - s1).min(p2 - s2) + scale, scale)
        }
    };

    let precision = precision.min(MAX_DECIMAL_PRECISION as u16).max(1) as u8;
    let scale = scale.min(precision as u16) as u8;
    SqlType::Decimal { precision, scale }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::Bigint => write!(f, "BIGINT"),
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::String => write!(f, "STRING"),
            SqlType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({}, {})", precision, scale)
            }
            SqlType::Array(element) => write!(f, "ARRAY<{}>", element),
            SqlType::Map(value) => write!(f, "MAP<STRING, {}>", value),
            SqlType::Struct(fields) => {
                write!(f, "STRUCT<")?;
                for (i, (name, field_type)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", name, field_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_predicates() {
        assert!(SqlType::Integer.is_numeric());
        assert!(SqlType::Integer.is_integer());
        assert!(SqlType::Double.is_numeric());
        assert!(!SqlType::Double.is_integer());
        assert!(SqlType::decimal(4, 2).unwrap().is_decimal());
        assert!(SqlType::array(SqlType::String).is_container());
    }

    #[test]
    fn test_decimal_bounds() {
        assert!(SqlType::decimal(38, 2).is_ok());
        assert!(SqlType::decimal(0, 0).is_err());
        assert!(SqlType::decimal(39, 2).is_err());
        assert!(SqlType::decimal(4, 5).is_err());
    }

    #[test]
    fn test_castable_to() {
        assert!(SqlType::Integer.castable_to(&SqlType::Bigint));
        assert!(SqlType::Integer.castable_to(&SqlType::decimal(10, 2).unwrap()));
        assert!(SqlType::String.castable_to(&SqlType::Boolean));
        assert!(SqlType::Boolean.castable_to(&SqlType::String));
        assert!(!SqlType::Boolean.castable_to(&SqlType::Integer));
        assert!(!SqlType::Struct(vec![]).castable_to(&SqlType::String));
        assert!(SqlType::array(SqlType::Integer).castable_to(&SqlType::array(SqlType::Integer)));
        assert!(!SqlType::array(SqlType::Integer).castable_to(&SqlType::array(SqlType::String)));
    }

    #[test]
    fn test_integer_arithmetic_widens() {
        let t = SqlType::resolve_arithmetic(&SqlType::Integer, &SqlType::Integer, ArithmeticOp::Add)
            .unwrap();
        assert_eq!(t, SqlType::Integer);

        let t = SqlType::resolve_arithmetic(&SqlType::Integer, &SqlType::Bigint, ArithmeticOp::Add)
            .unwrap();
        assert_eq!(t, SqlType::Bigint);
    }

    #[test]
    fn test_double_absorbs() {
        let t = SqlType::resolve_arithmetic(
            &SqlType::Double,
            &SqlType::decimal(10, 2).unwrap(),
            ArithmeticOp::Multiply,
        )
        .unwrap();
        assert_eq!(t, SqlType::Double);
    }

    #[test]
    fn test_decimal_addition_rule() {
        // DECIMAL(p1,s1) + DECIMAL(p2,s2)
        //   = DECIMAL(max(p1-s1, p2-s2) + max(s1,s2) + 1, max(s1,s2))
        let t = SqlType::resolve_arithmetic(
            &SqlType::decimal(5, 2).unwrap(),
            &SqlType::decimal(7, 3).unwrap(),
            ArithmeticOp::Add,
        )
        .unwrap();
        assert_eq!(t, SqlType::decimal(8, 3).unwrap());
    }

    #[test]
    fn test_decimal_multiply_rule() {
        let t = SqlType::resolve_arithmetic(
            &SqlType::decimal(5, 2).unwrap(),
            &SqlType::decimal(7, 3).unwrap(),
            ArithmeticOp::Multiply,
        )
        .unwrap();
        assert_eq!(t, SqlType::decimal(13, 5).unwrap());
    }

    #[test]
    fn test_decimal_promotes_integer() {
        let t = SqlType::resolve_arithmetic(
            &SqlType::decimal(5, 2).unwrap(),
            &SqlType::Integer,
            ArithmeticOp::Add,
        )
        .unwrap();
        // INTEGER widens to DECIMAL(10, 0): max(5-2, 10) + 2 + 1 = 13
        assert_eq!(t, SqlType::decimal(13, 2).unwrap());
    }

    #[test]
    fn test_string_is_inert() {
        let err =
            SqlType::resolve_arithmetic(&SqlType::String, &SqlType::Integer, ArithmeticOp::Add);
        assert!(matches!(
            err,
            Err(RapidsError::ArithmeticTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_comparability() {
        assert!(SqlType::Integer.comparable_with(&SqlType::Double, ComparisonOp::Lt));
        assert!(SqlType::decimal(4, 1)
            .unwrap()
            .comparable_with(&SqlType::Bigint, ComparisonOp::Gt));
        assert!(SqlType::String.comparable_with(&SqlType::String, ComparisonOp::Lt));
        assert!(!SqlType::String.comparable_with(&SqlType::Integer, ComparisonOp::Eq));
        assert!(SqlType::Boolean.comparable_with(&SqlType::Boolean, ComparisonOp::Eq));
        assert!(!SqlType::Boolean.comparable_with(&SqlType::Boolean, ComparisonOp::Lt));
        assert!(!SqlType::array(SqlType::Integer)
            .comparable_with(&SqlType::array(SqlType::Integer), ComparisonOp::Eq));
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlType::decimal(6, 2).unwrap().to_string(), "DECIMAL(6, 2)");
        assert_eq!(SqlType::array(SqlType::String).to_string(), "ARRAY<STRING>");
        assert_eq!(SqlType::map(SqlType::Double).to_string(), "MAP<STRING, DOUBLE>");
        assert_eq!(
            SqlType::Struct(vec![("a".into(), SqlType::Bigint)]).to_string(),
            "STRUCT<a BIGINT>"
        );
    }
}
