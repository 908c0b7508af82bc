//! Built-in scalar and aggregate functions.

use std::sync::Arc;

use crate::error::{RapidsError, Result};
use crate::function::{
    AggregateDescriptor, Aggregator, FunctionRegistry, ScalarDescriptor, ScalarFunction,
    WINDOW_END_NAME, WINDOW_START_NAME,
};
use crate::schema::FunctionName;
use crate::types::{SqlType, Value};

const SCALAR_NAMES: &[&str] = &["ABS", "CONCAT", "LCASE", "LEN", "SUBSTRING", "UCASE"];
const AGGREGATE_NAMES: &[&str] = &[
    "COUNT",
    "MAX",
    "MIN",
    "SUM",
    WINDOW_END_NAME,
    WINDOW_START_NAME,
];

/// The registry of functions shipped with the engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreFunctionRegistry;

impl CoreFunctionRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl FunctionRegistry for CoreFunctionRegistry {
    fn is_aggregate(&self, name: &FunctionName) -> bool {
        AGGREGATE_NAMES.contains(&name.canonical().as_str())
    }

    fn scalar(&self, name: &FunctionName, arg_types: &[SqlType]) -> Result<ScalarDescriptor> {
        let canonical = name.canonical();

        let (return_type, factory): (SqlType, fn() -> Arc<dyn ScalarFunction>) =
            match canonical.as_str() {
                "UCASE" => {
                    check_string_unary(&canonical, arg_types)?;
                    (SqlType::String, || Arc::new(Ucase))
                }
                "LCASE" => {
                    check_string_unary(&canonical, arg_types)?;
                    (SqlType::String, || Arc::new(Lcase))
                }
                "LEN" => {
                    check_string_unary(&canonical, arg_types)?;
                    (SqlType::Integer, || Arc::new(Len))
                }
                "SUBSTRING" => {
                    check_arity(&canonical, arg_types, 2..=3)?;
                    let ok = arg_types[0] == SqlType::String
                        && arg_types[1..].iter().all(SqlType::is_integer);
                    if !ok {
                        return Err(signature_mismatch(&canonical, arg_types));
                    }
                    (SqlType::String, || Arc::new(Substring))
                }
                "ABS" => {
                    check_arity(&canonical, arg_types, 1..=1)?;
                    if !arg_types[0].is_numeric() {
                        return Err(signature_mismatch(&canonical, arg_types));
                    }
                    (arg_types[0].clone(), || Arc::new(Abs))
                }
                "CONCAT" => {
                    if arg_types.len() < 2 {
                        return Err(RapidsError::function_arity(format!(
                            "CONCAT takes at least 2 arguments, got {}",
                            arg_types.len()
                        )));
                    }
                    if arg_types.iter().any(|t| *t != SqlType::String) {
                        return Err(signature_mismatch(&canonical, arg_types));
                    }
                    (SqlType::String, || Arc::new(Concat))
                }
                _ => {
                    return Err(RapidsError::unknown_function_with_suggestions(
                        name.as_str(),
                        &self.function_names(),
                    ))
                }
            };

        Ok(ScalarDescriptor::new(
            canonical,
            return_type,
            Arc::new(factory),
        ))
    }

    fn aggregate(&self, name: &FunctionName, arg_type: &SqlType) -> Result<AggregateDescriptor> {
        let canonical = name.canonical();

        let (return_type, factory): (SqlType, fn() -> Arc<dyn Aggregator>) =
            match canonical.as_str() {
                "COUNT" => (SqlType::Bigint, || Arc::new(CountAggregator)),
                "SUM" => {
                    if !arg_type.is_numeric() {
                        return Err(signature_mismatch(&canonical, &[arg_type.clone()]));
                    }
                    (arg_type.clone(), || Arc::new(SumAggregator))
                }
                "MIN" | "MAX" => {
                    if !arg_type.is_numeric() {
                        return Err(signature_mismatch(&canonical, &[arg_type.clone()]));
                    }
                    let factory: fn() -> Arc<dyn Aggregator> = if canonical.as_str() == "MIN" {
                        || Arc::new(MinMaxAggregator { want_min: true })
                    } else {
                        || Arc::new(MinMaxAggregator { want_min: false })
                    };
                    (arg_type.clone(), factory)
                }
                // Placeholder slots, overwritten by the window selector.
                WINDOW_START_NAME | WINDOW_END_NAME => (SqlType::Bigint, || Arc::new(NullAggregator)),
                _ => {
                    return Err(RapidsError::unknown_function_with_suggestions(
                        name.as_str(),
                        &self.function_names(),
                    ))
                }
            };

        Ok(AggregateDescriptor::new(
            canonical,
            return_type,
            Arc::new(factory),
        ))
    }

    fn function_names(&self) -> Vec<String> {
        SCALAR_NAMES
            .iter()
            .chain(AGGREGATE_NAMES)
            .map(|n| n.to_string())
            .collect()
    }
}

fn check_arity(
    name: &FunctionName,
    arg_types: &[SqlType],
    expected: std::ops::RangeInclusive<usize>,
) -> Result<()> {
    if expected.contains(&arg_types.len()) {
        return Ok(());
    }
    let wanted = if expected.start() == expected.end() {
        expected.start().to_string()
    } else {
        format!("{} to {}", expected.start(), expected.end())
    };
    Err(RapidsError::function_arity(format!(
        "{} takes {} arguments, got {}",
        name,
        wanted,
        arg_types.len()
    )))
}

fn check_string_unary(name: &FunctionName, arg_types: &[SqlType]) -> Result<()> {
    check_arity(name, arg_types, 1..=1)?;
    if arg_types[0] != SqlType::String {
        return Err(signature_mismatch(name, arg_types));
    }
    Ok(())
}

fn signature_mismatch(name: &FunctionName, arg_types: &[SqlType]) -> RapidsError {
    let types = arg_types
        .iter()
        .map(SqlType::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    RapidsError::function_signature(format!("{} does not accept ({})", name, types))
}

// ---- scalar implementations ----

#[derive(Debug)]
struct Ucase;

impl ScalarFunction for Ucase {
    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        Ok(match args[0].try_as_str()? {
            Some(s) => Value::String(s.to_uppercase()),
            None => Value::Null,
        })
    }
}

#[derive(Debug)]
struct Lcase;

impl ScalarFunction for Lcase {
    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        Ok(match args[0].try_as_str()? {
            Some(s) => Value::String(s.to_lowercase()),
            None => Value::Null,
        })
    }
}

#[derive(Debug)]
struct Len;

impl ScalarFunction for Len {
    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        Ok(match args[0].try_as_str()? {
            Some(s) => Value::Integer(s.chars().count() as i32),
            None => Value::Null,
        })
    }
}

/// SUBSTRING(str, pos [, len]) with 1-based positions.
#[derive(Debug)]
struct Substring;

impl ScalarFunction for Substring {
    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        let (Some(text), Some(pos)) = (args[0].try_as_str()?, args[1].try_as_i64()?) else {
            return Ok(Value::Null);
        };
        let len = match args.get(2) {
            Some(v) => match v.try_as_i64()? {
                Some(len) if len >= 0 => Some(len as usize),
                Some(_) => return Ok(Value::Null),
                None => return Ok(Value::Null),
            },
            None => None,
        };

        let chars: Vec<char> = text.chars().collect();
        let start = (pos.max(1) as usize).saturating_sub(1).min(chars.len());
        let end = match len {
            Some(len) => (start + len).min(chars.len()),
            None => chars.len(),
        };

        Ok(Value::String(chars[start..end].iter().collect()))
    }
}

#[derive(Debug)]
struct Abs;

impl ScalarFunction for Abs {
    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::Null => Value::Null,
            Value::Integer(v) => Value::Integer(v.abs()),
            Value::Bigint(v) => Value::Bigint(v.abs()),
            Value::Double(v) => Value::Double(v.abs()),
            Value::Decimal {
                unscaled,
                precision,
                scale,
            } => Value::decimal(unscaled.abs(), *precision, *scale),
            other => {
                return Err(RapidsError::eval(format!(
                    "ABS applied to non-numeric value {}",
                    other
                )))
            }
        })
    }
}

#[derive(Debug)]
struct Concat;

impl ScalarFunction for Concat {
    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        let mut out = String::new();
        for arg in args {
            match arg.try_as_str()? {
                Some(s) => out.push_str(s),
                None => return Ok(Value::Null),
            }
        }
        Ok(Value::String(out))
    }
}

// ---- aggregate implementations ----

#[derive(Debug)]
struct CountAggregator;

impl Aggregator for CountAggregator {
    fn init(&self) -> Value {
        Value::Bigint(0)
    }

    fn accumulate(&self, accumulator: &Value, input: &Value) -> Value {
        let count = accumulator.try_as_i64().ok().flatten().unwrap_or(0);
        if input.is_null() {
            Value::Bigint(count)
        } else {
            Value::Bigint(count + 1)
        }
    }

    fn merge(&self, left: &Value, right: &Value) -> Value {
        let l = left.try_as_i64().ok().flatten().unwrap_or(0);
        let r = right.try_as_i64().ok().flatten().unwrap_or(0);
        Value::Bigint(l + r)
    }
}

#[derive(Debug)]
struct SumAggregator;

impl Aggregator for SumAggregator {
    fn init(&self) -> Value {
        Value::Null
    }

    fn accumulate(&self, accumulator: &Value, input: &Value) -> Value {
        sum_values(accumulator, input)
    }

    fn merge(&self, left: &Value, right: &Value) -> Value {
        sum_values(left, right)
    }
}

fn sum_values(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Null, v) | (v, Value::Null) => v.clone(),
        (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_add(*b)),
        (Value::Bigint(a), Value::Bigint(b)) => Value::Bigint(a.wrapping_add(*b)),
        (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (
            Value::Decimal {
                unscaled: a,
                precision,
                scale,
            },
            Value::Decimal { unscaled: b, .. },
        ) => Value::decimal(a + b, *precision, *scale),
        _ => Value::Null,
    }
}

#[derive(Debug)]
struct MinMaxAggregator {
    want_min: bool,
}

impl Aggregator for MinMaxAggregator {
    fn init(&self) -> Value {
        Value::Null
    }

    fn accumulate(&self, accumulator: &Value, input: &Value) -> Value {
        match (accumulator, input) {
            (Value::Null, v) | (v, Value::Null) => v.clone(),
            (acc, v) => {
                let acc_f = acc.try_as_f64().ok().flatten();
                let v_f = v.try_as_f64().ok().flatten();
                match (acc_f, v_f) {
                    (Some(a), Some(b)) => {
                        if (b < a) == self.want_min {
                            v.clone()
                        } else {
                            acc.clone()
                        }
                    }
                    _ => acc.clone(),
                }
            }
        }
    }

    fn merge(&self, left: &Value, right: &Value) -> Value {
        self.accumulate(left, right)
    }
}

/// Slot filler for WINDOWSTART / WINDOWEND; the real value is written by
/// the window selector after aggregation.
#[derive(Debug)]
struct NullAggregator;

impl Aggregator for NullAggregator {
    fn init(&self) -> Value {
        Value::Null
    }

    fn accumulate(&self, _accumulator: &Value, _input: &Value) -> Value {
        Value::Null
    }

    fn merge(&self, _left: &Value, _right: &Value) -> Value {
        Value::Null
    }
}
