//! Compiled row-level expression evaluators.
//!
//! Code generation lowers a type-checked [`Expression`](crate::expr::Expression)
//! into a tree of [`RowExpr`] trait objects. Evaluation is deterministic and
//! side-effect free; nulls propagate through arithmetic and make every
//! comparison false.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use crate::codegen::like::LikePattern;
use crate::error::{RapidsError, Result};
use crate::function::ScalarFunction;
use crate::schema::coerce::digits;
use crate::types::{ArithmeticOp, ComparisonOp, Row, SqlType, Value};

/// A compiled expression node, evaluated against a single row.
pub trait RowExpr: Debug + Send + Sync {
    /// The inferred type of this node.
    fn data_type(&self) -> SqlType;

    /// Evaluate against a row of value-column values.
    fn evaluate(&self, row: &Row) -> Result<Value>;
}

/// Reference to a value column by position.
#[derive(Debug)]
pub struct ColumnExpr {
    full_name: String,
    index: usize,
    sql_type: SqlType,
}

impl ColumnExpr {
    pub fn new(full_name: impl Into<String>, index: usize, sql_type: SqlType) -> Self {
        Self {
            full_name: full_name.into(),
            index,
            sql_type,
        }
    }
}

impl RowExpr for ColumnExpr {
    fn data_type(&self) -> SqlType {
        self.sql_type.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        row.column(self.index).cloned().ok_or_else(|| {
            RapidsError::internal(format!(
                "row has {} columns, column '{}' expects index {}",
                row.len(),
                self.full_name,
                self.index
            ))
        })
    }
}

/// Literal value.
#[derive(Debug)]
pub struct LiteralExpr {
    value: Value,
    sql_type: SqlType,
}

impl LiteralExpr {
    pub fn new(value: Value, sql_type: SqlType) -> Self {
        Self { value, sql_type }
    }
}

impl RowExpr for LiteralExpr {
    fn data_type(&self) -> SqlType {
        self.sql_type.clone()
    }

    fn evaluate(&self, _row: &Row) -> Result<Value> {
        Ok(self.value.clone())
    }
}

/// Binary arithmetic with the result type fixed by inference.
#[derive(Debug)]
pub struct ArithmeticExpr {
    op: ArithmeticOp,
    left: Arc<dyn RowExpr>,
    right: Arc<dyn RowExpr>,
    result_type: SqlType,
}

impl ArithmeticExpr {
    pub fn new(
        op: ArithmeticOp,
        left: Arc<dyn RowExpr>,
        right: Arc<dyn RowExpr>,
        result_type: SqlType,
    ) -> Self {
        Self {
            op,
            left,
            right,
            result_type,
        }
    }
}

impl RowExpr for ArithmeticExpr {
    fn data_type(&self) -> SqlType {
        self.result_type.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let left = self.left.evaluate(row)?;
        let right = self.right.evaluate(row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        match &self.result_type {
            SqlType::Integer => {
                let l = int_operand(&left)? as i32;
                let r = int_operand(&right)? as i32;
                int32_arithmetic(l, r, self.op).map(Value::Integer)
            }
            SqlType::Bigint => {
                let l = int_operand(&left)?;
                let r = int_operand(&right)?;
                int64_arithmetic(l, r, self.op).map(Value::Bigint)
            }
            SqlType::Double => {
                let l = left.try_as_f64()?.expect("checked non-null");
                let r = right.try_as_f64()?.expect("checked non-null");
                Ok(Value::Double(match self.op {
                    ArithmeticOp::Add => l + r,
                    ArithmeticOp::Subtract => l - r,
                    ArithmeticOp::Multiply => l * r,
                    ArithmeticOp::Divide => l / r,
                    ArithmeticOp::Modulus => l % r,
                }))
            }
            SqlType::Decimal { precision, scale } => {
                decimal_arithmetic(&left, &right, self.op, *precision, *scale)
            }
            other => Err(RapidsError::internal(format!(
                "arithmetic with non-numeric result type {}",
                other
            ))),
        }
    }
}

fn int_operand(value: &Value) -> Result<i64> {
    value
        .try_as_i64()?
        .ok_or_else(|| RapidsError::internal("null slipped past the null check".to_string()))
}

fn int32_arithmetic(l: i32, r: i32, op: ArithmeticOp) -> Result<i32> {
    let result = match op {
        ArithmeticOp::Add => l.checked_add(r),
        ArithmeticOp::Subtract => l.checked_sub(r),
        ArithmeticOp::Multiply => l.checked_mul(r),
        ArithmeticOp::Divide => l.checked_div(r),
        ArithmeticOp::Modulus => l.checked_rem(r),
    };
    result.ok_or_else(|| arithmetic_failure(op, r == 0))
}

fn int64_arithmetic(l: i64, r: i64, op: ArithmeticOp) -> Result<i64> {
    let result = match op {
        ArithmeticOp::Add => l.checked_add(r),
        ArithmeticOp::Subtract => l.checked_sub(r),
        ArithmeticOp::Multiply => l.checked_mul(r),
        ArithmeticOp::Divide => l.checked_div(r),
        ArithmeticOp::Modulus => l.checked_rem(r),
    };
    result.ok_or_else(|| arithmetic_failure(op, r == 0))
}

fn arithmetic_failure(op: ArithmeticOp, division_by_zero: bool) -> RapidsError {
    if division_by_zero && matches!(op, ArithmeticOp::Divide | ArithmeticOp::Modulus) {
        RapidsError::eval("division by zero".to_string())
    } else {
        RapidsError::eval(format!("integer overflow in '{}'", op))
    }
}

/// Exact decimal arithmetic over the unscaled i128 representation.
///
/// The inferred precision and scale are authoritative: a result that would
/// need rounding to fit them is an evaluation error, never a silent round.
fn decimal_arithmetic(
    left: &Value,
    right: &Value,
    op: ArithmeticOp,
    precision: u8,
    scale: u8,
) -> Result<Value> {
    let (l, ls) = decimal_operand(left)?;
    let (r, rs) = decimal_operand(right)?;

    let overflow = || RapidsError::eval(format!("decimal overflow in '{}'", op));

    let (unscaled, natural_scale) = match op {
        ArithmeticOp::Add | ArithmeticOp::Subtract => {
            let common = ls.max(rs);
            let l = upscale(l, common - ls).ok_or_else(overflow)?;
            let r = upscale(r, common - rs).ok_or_else(overflow)?;
            let result = if op == ArithmeticOp::Add {
                l.checked_add(r)
            } else {
                l.checked_sub(r)
            };
            (result.ok_or_else(overflow)?, common)
        }
        ArithmeticOp::Multiply => (l.checked_mul(r).ok_or_else(overflow)?, ls + rs),
        ArithmeticOp::Divide => {
            if r == 0 {
                return Err(RapidsError::eval("division by zero".to_string()));
            }
            // Scale the numerator so the quotient lands on the target scale.
            let shift = (scale + rs) as i16 - ls as i16;
            let numerator = if shift >= 0 {
                upscale(l, shift as u8).ok_or_else(overflow)?
            } else {
                exact_downscale(l, (-shift) as u8).ok_or_else(|| rounding_needed(op))?
            };
            if numerator % r != 0 {
                return Err(rounding_needed(op));
            }
            (numerator / r, scale)
        }
        ArithmeticOp::Modulus => {
            if r == 0 {
                return Err(RapidsError::eval("division by zero".to_string()));
            }
            let common = ls.max(rs);
            let l = upscale(l, common - ls).ok_or_else(overflow)?;
            let r = upscale(r, common - rs).ok_or_else(overflow)?;
            (l % r, common)
        }
    };

    // Rescale exactly to the inferred scale.
    let rescaled = if scale >= natural_scale {
        upscale(unscaled, scale - natural_scale).ok_or_else(overflow)?
    } else {
        exact_downscale(unscaled, natural_scale - scale).ok_or_else(|| rounding_needed(op))?
    };

    if digits(rescaled) > precision as u32 {
        return Err(RapidsError::eval(format!(
            "decimal result {} exceeds precision {}",
            rescaled, precision
        )));
    }

    Ok(Value::decimal(rescaled, precision, scale))
}

fn rounding_needed(op: ArithmeticOp) -> RapidsError {
    RapidsError::eval(format!(
        "decimal '{}' requires rounding; the inferred scale is authoritative",
        op
    ))
}

fn decimal_operand(value: &Value) -> Result<(i128, u8)> {
    match value {
        Value::Integer(v) => Ok((*v as i128, 0)),
        Value::Bigint(v) => Ok((*v as i128, 0)),
        Value::Decimal {
            unscaled, scale, ..
        } => Ok((*unscaled, *scale)),
        other => Err(RapidsError::internal(format!(
            "non-decimal operand {} in decimal arithmetic",
            other
        ))),
    }
}

fn upscale(unscaled: i128, by: u8) -> Option<i128> {
    unscaled.checked_mul(10i128.checked_pow(by as u32)?)
}

fn exact_downscale(unscaled: i128, by: u8) -> Option<i128> {
    let divisor = 10i128.checked_pow(by as u32)?;
    if unscaled % divisor != 0 {
        return None;
    }
    Some(unscaled / divisor)
}

/// Unary plus / minus.
#[derive(Debug)]
pub struct NegateExpr {
    negate: bool,
    inner: Arc<dyn RowExpr>,
}

impl NegateExpr {
    pub fn new(negate: bool, inner: Arc<dyn RowExpr>) -> Self {
        Self { negate, inner }
    }
}

impl RowExpr for NegateExpr {
    fn data_type(&self) -> SqlType {
        self.inner.data_type()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let value = self.inner.evaluate(row)?;
        if !self.negate {
            return Ok(value);
        }
        Ok(match value {
            Value::Null => Value::Null,
            Value::Integer(v) => Value::Integer(-v),
            Value::Bigint(v) => Value::Bigint(-v),
            Value::Double(v) => Value::Double(-v),
            Value::Decimal {
                unscaled,
                precision,
                scale,
            } => Value::decimal(-unscaled, precision, scale),
            other => {
                return Err(RapidsError::internal(format!(
                    "cannot negate non-numeric value {}",
                    other
                )))
            }
        })
    }
}

/// Compare two non-null values of comparison-compatible types.
///
/// A decimal compared with a non-decimal widens the non-decimal side to
/// decimal; integer/double mixes compare as doubles.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Result<Ordering> {
    let incomparable = || {
        RapidsError::internal(format!(
            "runtime comparison of incompatible values {} and {}",
            left, right
        ))
    };

    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
        (Value::Double(_), _) | (_, Value::Double(_)) => {
            let a = left.try_as_f64().map_err(|_| incomparable())?;
            let b = right.try_as_f64().map_err(|_| incomparable())?;
            let (a, b) = (a.expect("non-null"), b.expect("non-null"));
            Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        }
        (Value::Decimal { .. }, _) | (_, Value::Decimal { .. }) => {
            let (a, sa) = decimal_operand(left)?;
            let (b, sb) = decimal_operand(right)?;
            let common = sa.max(sb);
            let overflow = || RapidsError::eval("decimal comparison overflow".to_string());
            let a = upscale(a, common - sa).ok_or_else(overflow)?;
            let b = upscale(b, common - sb).ok_or_else(overflow)?;
            Ok(a.cmp(&b))
        }
        _ => {
            let a = left.try_as_i64().map_err(|_| incomparable())?;
            let b = right.try_as_i64().map_err(|_| incomparable())?;
            Ok(a.expect("non-null").cmp(&b.expect("non-null")))
        }
    }
}

fn ordering_satisfies(op: ComparisonOp, ordering: Ordering) -> bool {
    match op {
        ComparisonOp::Eq => ordering == Ordering::Equal,
        ComparisonOp::NotEq => ordering != Ordering::Equal,
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::LtEq => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::GtEq => ordering != Ordering::Less,
    }
}

/// Binary comparison; null on either side yields `false`.
#[derive(Debug)]
pub struct ComparisonExpr {
    op: ComparisonOp,
    left: Arc<dyn RowExpr>,
    right: Arc<dyn RowExpr>,
}

impl ComparisonExpr {
    pub fn new(op: ComparisonOp, left: Arc<dyn RowExpr>, right: Arc<dyn RowExpr>) -> Self {
        Self { op, left, right }
    }
}

impl RowExpr for ComparisonExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let left = self.left.evaluate(row)?;
        let right = self.right.evaluate(row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Boolean(false));
        }
        let ordering = compare_values(&left, &right)?;
        Ok(Value::Boolean(ordering_satisfies(self.op, ordering)))
    }
}

/// Short-circuiting AND / OR; null operands read as false.
#[derive(Debug)]
pub struct LogicalExpr {
    is_and: bool,
    left: Arc<dyn RowExpr>,
    right: Arc<dyn RowExpr>,
}

impl LogicalExpr {
    pub fn new(is_and: bool, left: Arc<dyn RowExpr>, right: Arc<dyn RowExpr>) -> Self {
        Self { is_and, left, right }
    }
}

impl RowExpr for LogicalExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let left = self.left.evaluate(row)?.try_as_bool()?.unwrap_or(false);

        if self.is_and && !left {
            return Ok(Value::Boolean(false));
        }
        if !self.is_and && left {
            return Ok(Value::Boolean(true));
        }

        let right = self.right.evaluate(row)?.try_as_bool()?.unwrap_or(false);
        Ok(Value::Boolean(right))
    }
}

/// Boolean NOT; null stays null.
#[derive(Debug)]
pub struct NotExpr {
    inner: Arc<dyn RowExpr>,
}

impl NotExpr {
    pub fn new(inner: Arc<dyn RowExpr>) -> Self {
        Self { inner }
    }
}

impl RowExpr for NotExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        Ok(match self.inner.evaluate(row)?.try_as_bool()? {
            Some(v) => Value::Boolean(!v),
            None => Value::Null,
        })
    }
}

/// IS NULL / IS NOT NULL.
#[derive(Debug)]
pub struct NullCheckExpr {
    negated: bool,
    inner: Arc<dyn RowExpr>,
}

impl NullCheckExpr {
    pub fn new(negated: bool, inner: Arc<dyn RowExpr>) -> Self {
        Self { negated, inner }
    }
}

impl RowExpr for NullCheckExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let is_null = self.inner.evaluate(row)?.is_null();
        Ok(Value::Boolean(is_null != self.negated))
    }
}

/// BETWEEN as a pair of comparisons; null anywhere yields false.
#[derive(Debug)]
pub struct BetweenExpr {
    value: Arc<dyn RowExpr>,
    min: Arc<dyn RowExpr>,
    max: Arc<dyn RowExpr>,
    negated: bool,
}

impl BetweenExpr {
    pub fn new(
        value: Arc<dyn RowExpr>,
        min: Arc<dyn RowExpr>,
        max: Arc<dyn RowExpr>,
        negated: bool,
    ) -> Self {
        Self {
            value,
            min,
            max,
            negated,
        }
    }
}

impl RowExpr for BetweenExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let value = self.value.evaluate(row)?;
        let min = self.min.evaluate(row)?;
        let max = self.max.evaluate(row)?;
        if value.is_null() || min.is_null() || max.is_null() {
            return Ok(Value::Boolean(false));
        }

        let within = compare_values(&value, &min)? != Ordering::Less
            && compare_values(&value, &max)? != Ordering::Greater;
        Ok(Value::Boolean(within != self.negated))
    }
}

/// LIKE with a pre-compiled pattern.
#[derive(Debug)]
pub struct LikeExpr {
    value: Arc<dyn RowExpr>,
    pattern: LikePattern,
    negated: bool,
}

impl LikeExpr {
    pub fn new(value: Arc<dyn RowExpr>, pattern: LikePattern, negated: bool) -> Self {
        Self {
            value,
            pattern,
            negated,
        }
    }
}

impl RowExpr for LikeExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        Ok(match self.value.evaluate(row)?.try_as_str()? {
            Some(text) => Value::Boolean(self.pattern.matches(text) != self.negated),
            None => Value::Boolean(false),
        })
    }
}

/// IN list via repeated equality.
#[derive(Debug)]
pub struct InListExpr {
    value: Arc<dyn RowExpr>,
    list: Vec<Arc<dyn RowExpr>>,
    negated: bool,
}

impl InListExpr {
    pub fn new(value: Arc<dyn RowExpr>, list: Vec<Arc<dyn RowExpr>>, negated: bool) -> Self {
        Self {
            value,
            list,
            negated,
        }
    }
}

impl RowExpr for InListExpr {
    fn data_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let value = self.value.evaluate(row)?;
        if value.is_null() {
            return Ok(Value::Boolean(false));
        }

        let mut found = false;
        for item in &self.list {
            let item = item.evaluate(row)?;
            if item.is_null() {
                continue;
            }
            if compare_values(&value, &item)? == Ordering::Equal {
                found = true;
                break;
            }
        }
        Ok(Value::Boolean(found != self.negated))
    }
}

/// CAST to a target type.
#[derive(Debug)]
pub struct CastExpr {
    inner: Arc<dyn RowExpr>,
    target: SqlType,
}

impl CastExpr {
    pub fn new(inner: Arc<dyn RowExpr>, target: SqlType) -> Self {
        Self { inner, target }
    }
}

impl RowExpr for CastExpr {
    fn data_type(&self) -> SqlType {
        self.target.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        cast_value(self.inner.evaluate(row)?, &self.target)
    }
}

/// Runtime value conversion for CAST.
pub(crate) fn cast_value(value: Value, target: &SqlType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if value.data_type().as_ref() == Some(target) {
        return Ok(value);
    }

    let failed = |value: &Value| {
        RapidsError::eval(format!("cannot cast {} to {}", value, target))
    };

    match target {
        SqlType::String => Ok(Value::String(match &value {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            other => other.to_string(),
        })),
        SqlType::Boolean => match &value {
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" => Ok(Value::Boolean(true)),
                "false" | "f" | "no" | "n" => Ok(Value::Boolean(false)),
                _ => Err(failed(&value)),
            },
            _ => Err(failed(&value)),
        },
        SqlType::Integer => {
            let wide = cast_to_i64(&value).ok_or_else(|| failed(&value))?;
            i32::try_from(wide)
                .map(Value::Integer)
                .map_err(|_| failed(&value))
        }
        SqlType::Bigint => cast_to_i64(&value)
            .map(Value::Bigint)
            .ok_or_else(|| failed(&value)),
        SqlType::Double => match &value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| failed(&value)),
            other => other.try_as_f64()?.map(Value::Double).ok_or_else(|| failed(other)),
        },
        SqlType::Decimal { precision, scale } => cast_to_decimal(&value, *precision, *scale)
            .ok_or_else(|| failed(&value)),
        _ => Err(failed(&value)),
    }
}

fn cast_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(v) => Some(*v as i64),
        Value::Bigint(v) => Some(*v),
        Value::Double(v) => {
            let truncated = v.trunc();
            if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                Some(truncated as i64)
            } else {
                None
            }
        }
        Value::Decimal {
            unscaled, scale, ..
        } => {
            let divisor = 10i128.checked_pow(*scale as u32)?;
            i64::try_from(unscaled / divisor).ok()
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Cast to decimal; scale reduction rounds half-up, but integer digits must
/// fit the target precision.
fn cast_to_decimal(value: &Value, precision: u8, scale: u8) -> Option<Value> {
    let (unscaled, from_scale) = match value {
        Value::Integer(v) => (*v as i128, 0u8),
        Value::Bigint(v) => (*v as i128, 0),
        Value::Decimal {
            unscaled, scale, ..
        } => (*unscaled, *scale),
        Value::Double(v) => {
            let scaled = (v * 10f64.powi(scale as i32)).round();
            if !scaled.is_finite() {
                return None;
            }
            ((scaled as i128), scale)
        }
        Value::String(s) => return parse_decimal_string(s.trim(), precision, scale),
        _ => return None,
    };

    let rescaled = if scale >= from_scale {
        upscale(unscaled, scale - from_scale)?
    } else {
        round_half_up(unscaled, from_scale - scale)?
    };

    if digits(rescaled) > precision as u32 {
        return None;
    }
    Some(Value::decimal(rescaled, precision, scale))
}

fn round_half_up(unscaled: i128, by: u8) -> Option<i128> {
    let divisor = 10i128.checked_pow(by as u32)?;
    let quotient = unscaled / divisor;
    let remainder = (unscaled % divisor).abs();
    if remainder * 2 >= divisor {
        Some(quotient + unscaled.signum())
    } else {
        Some(quotient)
    }
}

fn parse_decimal_string(text: &str, precision: u8, scale: u8) -> Option<Value> {
    let (sign, digits_text) = match text.strip_prefix('-') {
        Some(rest) => (-1i128, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };

    let (int_part, frac_part) = match digits_text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits_text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let mut unscaled: i128 = 0;
    for c in int_part.chars().chain(frac_part.chars()) {
        unscaled = unscaled.checked_mul(10)?.checked_add((c as u8 - b'0') as i128)?;
    }
    unscaled *= sign;

    cast_to_decimal(
        &Value::decimal(unscaled, crate::types::MAX_DECIMAL_PRECISION, frac_part.len() as u8),
        precision,
        scale,
    )
}

/// ARRAY / MAP subscript; out-of-range and missing keys yield null.
#[derive(Debug)]
pub struct SubscriptExpr {
    base: Arc<dyn RowExpr>,
    index: Arc<dyn RowExpr>,
    result_type: SqlType,
}

impl SubscriptExpr {
    pub fn new(base: Arc<dyn RowExpr>, index: Arc<dyn RowExpr>, result_type: SqlType) -> Self {
        Self {
            base,
            index,
            result_type,
        }
    }
}

impl RowExpr for SubscriptExpr {
    fn data_type(&self) -> SqlType {
        self.result_type.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let base = self.base.evaluate(row)?;
        let index = self.index.evaluate(row)?;

        match (base, index) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Array(items), index) => {
                let i = index
                    .try_as_i64()?
                    .ok_or_else(|| RapidsError::internal("null index".to_string()))?;
                // Negative indices count back from the end.
                let at = if i < 0 { items.len() as i64 + i } else { i };
                if at < 0 || at as usize >= items.len() {
                    return Ok(Value::Null);
                }
                Ok(items[at as usize].clone())
            }
            (Value::Map(entries), index) => {
                let key = index
                    .try_as_str()?
                    .ok_or_else(|| RapidsError::internal("null key".to_string()))?
                    .to_string();
                Ok(entries
                    .into_iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v)
                    .unwrap_or(Value::Null))
            }
            (other, _) => Err(RapidsError::internal(format!(
                "subscript applied to non-container value {}",
                other
            ))),
        }
    }
}

/// STRUCT field access.
#[derive(Debug)]
pub struct DereferenceExpr {
    base: Arc<dyn RowExpr>,
    field: String,
    result_type: SqlType,
}

impl DereferenceExpr {
    pub fn new(base: Arc<dyn RowExpr>, field: impl Into<String>, result_type: SqlType) -> Self {
        Self {
            base,
            field: field.into(),
            result_type,
        }
    }
}

impl RowExpr for DereferenceExpr {
    fn data_type(&self) -> SqlType {
        self.result_type.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        match self.base.evaluate(row)? {
            Value::Null => Ok(Value::Null),
            Value::Struct(fields) => Ok(fields
                .into_iter()
                .find(|(name, _)| *name == self.field)
                .map(|(_, v)| v)
                .unwrap_or(Value::Null)),
            other => Err(RapidsError::internal(format!(
                "dereference applied to non-struct value {}",
                other
            ))),
        }
    }
}

/// Scalar function call bound to a per-site instance.
pub struct FunctionExpr {
    site_id: String,
    function: Arc<dyn ScalarFunction>,
    args: Vec<Arc<dyn RowExpr>>,
    return_type: SqlType,
}

impl FunctionExpr {
    pub fn new(
        site_id: impl Into<String>,
        function: Arc<dyn ScalarFunction>,
        args: Vec<Arc<dyn RowExpr>>,
        return_type: SqlType,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            function,
            args,
            return_type,
        }
    }

    /// The stable per-call-site identifier.
    pub fn site_id(&self) -> &str {
        &self.site_id
    }
}

impl Debug for FunctionExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionExpr")
            .field("site_id", &self.site_id)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl RowExpr for FunctionExpr {
    fn data_type(&self) -> SqlType {
        self.return_type.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.evaluate(row))
            .collect::<Result<Vec<_>>>()?;
        self.function.evaluate(&args)
    }
}

/// Searched or simple CASE.
#[derive(Debug)]
pub struct CaseExpr {
    operand: Option<Arc<dyn RowExpr>>,
    when_then: Vec<(Arc<dyn RowExpr>, Arc<dyn RowExpr>)>,
    default: Option<Arc<dyn RowExpr>>,
    result_type: SqlType,
}

impl CaseExpr {
    pub fn new(
        operand: Option<Arc<dyn RowExpr>>,
        when_then: Vec<(Arc<dyn RowExpr>, Arc<dyn RowExpr>)>,
        default: Option<Arc<dyn RowExpr>>,
        result_type: SqlType,
    ) -> Self {
        Self {
            operand,
            when_then,
            default,
            result_type,
        }
    }
}

impl RowExpr for CaseExpr {
    fn data_type(&self) -> SqlType {
        self.result_type.clone()
    }

    fn evaluate(&self, row: &Row) -> Result<Value> {
        let operand = self
            .operand
            .as_ref()
            .map(|o| o.evaluate(row))
            .transpose()?;

        for (when, then) in &self.when_then {
            let matched = match &operand {
                // Simple CASE: equality against the operand.
                Some(operand) => {
                    if operand.is_null() {
                        false
                    } else {
                        let when = when.evaluate(row)?;
                        !when.is_null() && compare_values(operand, &when)? == Ordering::Equal
                    }
                }
                // Searched CASE: the WHEN is already a condition.
                None => when.evaluate(row)?.try_as_bool()?.unwrap_or(false),
            };

            if matched {
                return then.evaluate(row);
            }
        }

        match &self.default {
            Some(default) => default.evaluate(row),
            None => Ok(Value::Null),
        }
    }
}
