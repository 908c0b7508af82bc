//! Generic expression tree rewriting.
//!
//! A rewrite plugin is consulted pre-order for every node: returning
//! `Some(replacement)` substitutes the whole subtree (the rewriter does not
//! descend into the replacement); returning `None` recurses into the
//! children. Rewrites are structure-preserving — nodes the plugin does not
//! touch are reproduced exactly.

use crate::error::Result;
use crate::expr::{Expression, WhenClause};
use crate::util::timestamp::parse_timestamp;

/// Rewrite an expression with an infallible plugin.
pub fn rewrite<F>(expr: &Expression, plugin: &mut F) -> Expression
where
    F: FnMut(&Expression) -> Option<Expression>,
{
    let mut adapted = |node: &Expression| Ok(plugin(node));
    try_rewrite(expr, &mut adapted).expect("infallible plugin cannot fail")
}

/// Rewrite an expression with a fallible plugin.
pub fn try_rewrite<F>(expr: &Expression, plugin: &mut F) -> Result<Expression>
where
    F: FnMut(&Expression) -> Result<Option<Expression>>,
{
    if let Some(replacement) = plugin(expr)? {
        return Ok(replacement);
    }

    let rebuilt = match expr {
        Expression::NullLiteral
        | Expression::BooleanLiteral(_)
        | Expression::IntegerLiteral(_)
        | Expression::LongLiteral(_)
        | Expression::DoubleLiteral(_)
        | Expression::DecimalLiteral { .. }
        | Expression::StringLiteral(_)
        | Expression::ColumnRef(_) => expr.clone(),

        Expression::ArithmeticBinary { op, left, right } => Expression::ArithmeticBinary {
            op: *op,
            left: Box::new(try_rewrite(left, plugin)?),
            right: Box::new(try_rewrite(right, plugin)?),
        },
        Expression::ArithmeticUnary { sign, expr } => Expression::ArithmeticUnary {
            sign: *sign,
            expr: Box::new(try_rewrite(expr, plugin)?),
        },
        Expression::Comparison { op, left, right } => Expression::Comparison {
            op: *op,
            left: Box::new(try_rewrite(left, plugin)?),
            right: Box::new(try_rewrite(right, plugin)?),
        },
        Expression::Logical { op, left, right } => Expression::Logical {
            op: *op,
            left: Box::new(try_rewrite(left, plugin)?),
            right: Box::new(try_rewrite(right, plugin)?),
        },
        Expression::Not(inner) => Expression::Not(Box::new(try_rewrite(inner, plugin)?)),
        Expression::IsNull(inner) => Expression::IsNull(Box::new(try_rewrite(inner, plugin)?)),
        Expression::IsNotNull(inner) => {
            Expression::IsNotNull(Box::new(try_rewrite(inner, plugin)?))
        }
        Expression::Between {
            value,
            min,
            max,
            negated,
        } => Expression::Between {
            value: Box::new(try_rewrite(value, plugin)?),
            min: Box::new(try_rewrite(min, plugin)?),
            max: Box::new(try_rewrite(max, plugin)?),
            negated: *negated,
        },
        Expression::Like {
            value,
            pattern,
            negated,
        } => Expression::Like {
            value: Box::new(try_rewrite(value, plugin)?),
            pattern: Box::new(try_rewrite(pattern, plugin)?),
            negated: *negated,
        },
        Expression::InList {
            value,
            list,
            negated,
        } => Expression::InList {
            value: Box::new(try_rewrite(value, plugin)?),
            list: list
                .iter()
                .map(|item| try_rewrite(item, plugin))
                .collect::<Result<_>>()?,
            negated: *negated,
        },
        Expression::Cast { expr, target } => Expression::Cast {
            expr: Box::new(try_rewrite(expr, plugin)?),
            target: target.clone(),
        },
        Expression::Subscript { base, index } => Expression::Subscript {
            base: Box::new(try_rewrite(base, plugin)?),
            index: Box::new(try_rewrite(index, plugin)?),
        },
        Expression::Dereference { base, field } => Expression::Dereference {
            base: Box::new(try_rewrite(base, plugin)?),
            field: field.clone(),
        },
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name: name.clone(),
            args: args
                .iter()
                .map(|arg| try_rewrite(arg, plugin))
                .collect::<Result<_>>()?,
        },
        Expression::SearchedCase {
            when_clauses,
            default,
        } => Expression::SearchedCase {
            when_clauses: rewrite_when_clauses(when_clauses, plugin)?,
            default: rewrite_default(default, plugin)?,
        },
        Expression::SimpleCase {
            operand,
            when_clauses,
            default,
        } => Expression::SimpleCase {
            operand: Box::new(try_rewrite(operand, plugin)?),
            when_clauses: rewrite_when_clauses(when_clauses, plugin)?,
            default: rewrite_default(default, plugin)?,
        },
    };

    Ok(rebuilt)
}

fn rewrite_when_clauses<F>(clauses: &[WhenClause], plugin: &mut F) -> Result<Vec<WhenClause>>
where
    F: FnMut(&Expression) -> Result<Option<Expression>>,
{
    clauses
        .iter()
        .map(|clause| {
            Ok(WhenClause::new(
                try_rewrite(&clause.operand, plugin)?,
                try_rewrite(&clause.result, plugin)?,
            ))
        })
        .collect()
}

fn rewrite_default<F>(
    default: &Option<Box<Expression>>,
    plugin: &mut F,
) -> Result<Option<Box<Expression>>>
where
    F: FnMut(&Expression) -> Result<Option<Expression>>,
{
    default
        .as_ref()
        .map(|d| try_rewrite(d, plugin).map(Box::new))
        .transpose()
}

/// Normalize date-time string literals compared against `ROWTIME`.
///
/// A comparison (either orientation) or BETWEEN with the row-time column on
/// one side and a string literal on the other has the literal replaced by a
/// `LongLiteral` holding its epoch-millis value. Idempotent.
pub fn rewrite_rowtime(expr: &Expression) -> Result<Expression> {
    try_rewrite(expr, &mut |node| match node {
        Expression::Comparison { op, left, right } => {
            if is_rowtime(left) {
                if let Expression::StringLiteral(text) = right.as_ref() {
                    return Ok(Some(Expression::Comparison {
                        op: *op,
                        left: left.clone(),
                        right: Box::new(Expression::LongLiteral(parse_timestamp(text)?)),
                    }));
                }
            }
            if is_rowtime(right) {
                if let Expression::StringLiteral(text) = left.as_ref() {
                    return Ok(Some(Expression::Comparison {
                        op: *op,
                        left: Box::new(Expression::LongLiteral(parse_timestamp(text)?)),
                        right: right.clone(),
                    }));
                }
            }
            Ok(None)
        }
        Expression::Between {
            value,
            min,
            max,
            negated,
        } if is_rowtime(value) => {
            let rewrite_bound = |bound: &Expression| -> Result<Expression> {
                match bound {
                    Expression::StringLiteral(text) => {
                        Ok(Expression::LongLiteral(parse_timestamp(text)?))
                    }
                    other => Ok(other.clone()),
                }
            };
            Ok(Some(Expression::Between {
                value: value.clone(),
                min: Box::new(rewrite_bound(min)?),
                max: Box::new(rewrite_bound(max)?),
                negated: *negated,
            }))
        }
        _ => Ok(None),
    })
}

fn is_rowtime(expr: &Expression) -> bool {
    expr.as_column_ref().is_some_and(|c| c.is_rowtime())
}
