//! Implicit coercion of literal values to column types.
//!
//! Used by the insert-values path: widening only, never lossy. Integers
//! widen to wider integers, doubles, and decimals; strings coerce to
//! nothing but themselves.

use crate::types::{SqlType, Value};

/// Try to coerce `value` to `target`, returning `None` when no implicit
/// coercion exists. Nulls coerce to every type.
pub fn coerce(value: &Value, target: &SqlType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }

    match (value, target) {
        (Value::Boolean(v), SqlType::Boolean) => Some(Value::Boolean(*v)),
        (Value::String(v), SqlType::String) => Some(Value::String(v.clone())),
        (Value::Double(v), SqlType::Double) => Some(Value::Double(*v)),

        (Value::Integer(v), SqlType::Integer) => Some(Value::Integer(*v)),
        (Value::Integer(v), SqlType::Bigint) => Some(Value::Bigint(*v as i64)),
        (Value::Integer(v), SqlType::Double) => Some(Value::Double(*v as f64)),
        (Value::Integer(v), SqlType::Decimal { precision, scale }) => {
            integer_to_decimal(*v as i128, *precision, *scale)
        }

        (Value::Bigint(v), SqlType::Bigint) => Some(Value::Bigint(*v)),
        (Value::Bigint(v), SqlType::Double) => Some(Value::Double(*v as f64)),
        (Value::Bigint(v), SqlType::Decimal { precision, scale }) => {
            integer_to_decimal(*v as i128, *precision, *scale)
        }

        (
            Value::Decimal {
                unscaled,
                scale: from_scale,
                ..
            },
            SqlType::Decimal { precision, scale },
        ) => rescale(*unscaled, *from_scale, *precision, *scale),
        (decimal @ Value::Decimal { .. }, SqlType::Double) => {
            decimal.try_as_f64().ok().flatten().map(Value::Double)
        }

        _ => None,
    }
}

fn integer_to_decimal(value: i128, precision: u8, scale: u8) -> Option<Value> {
    rescale(value, 0, precision, scale)
}

/// Change a decimal's scale without losing digits; `None` when the value
/// does not fit the target precision or the rescale would truncate.
fn rescale(unscaled: i128, from_scale: u8, precision: u8, scale: u8) -> Option<Value> {
    let rescaled = if scale >= from_scale {
        unscaled.checked_mul(10i128.checked_pow((scale - from_scale) as u32)?)?
    } else {
        let divisor = 10i128.checked_pow((from_scale - scale) as u32)?;
        if unscaled % divisor != 0 {
            return None;
        }
        unscaled / divisor
    };

    if digits(rescaled) > precision as u32 {
        return None;
    }

    Some(Value::decimal(rescaled, precision, scale))
}

/// Count significant decimal digits of the unscaled value.
pub(crate) fn digits(unscaled: i128) -> u32 {
    let mut n = unscaled.unsigned_abs();
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}
