//! Expression type inference.

use crate::error::{RapidsError, Result};
use crate::expr::{ColumnRef, Expression, WhenClause};
use crate::function::FunctionRegistry;
use crate::schema::LogicalSchema;
use crate::types::{ComparisonOp, SqlType};

/// Infers the SQL type of an expression against a schema and a function
/// registry.
///
/// Inference walks the tree once; every contract violation surfaces as a
/// typed error naming the offending sub-expression.
pub struct TypeResolver<'a> {
    schema: &'a LogicalSchema,
    functions: &'a dyn FunctionRegistry,
}

impl<'a> TypeResolver<'a> {
    /// Create a resolver over a schema.
    pub fn new(schema: &'a LogicalSchema, functions: &'a dyn FunctionRegistry) -> Self {
        Self { schema, functions }
    }

    /// Resolve the type of `expr`.
    ///
    /// A bare `NULL` has no type of its own and is rejected here; use
    /// [`TypeResolver::resolve_opt`] where NULL is acceptable.
    pub fn resolve(&self, expr: &Expression) -> Result<SqlType> {
        self.resolve_opt(expr)?.ok_or_else(|| {
            RapidsError::type_mismatch(format!("cannot determine the type of {}", expr))
        })
    }

    /// Resolve the type of `expr`; `None` means the NULL literal, which any
    /// context accepts.
    pub fn resolve_opt(&self, expr: &Expression) -> Result<Option<SqlType>> {
        match expr {
            Expression::NullLiteral => Ok(None),
            Expression::BooleanLiteral(_) => Ok(Some(SqlType::Boolean)),
            Expression::IntegerLiteral(_) => Ok(Some(SqlType::Integer)),
            Expression::LongLiteral(_) => Ok(Some(SqlType::Bigint)),
            Expression::DoubleLiteral(_) => Ok(Some(SqlType::Double)),
            Expression::DecimalLiteral {
                precision, scale, ..
            } => Ok(Some(SqlType::Decimal {
                precision: *precision,
                scale: *scale,
            })),
            Expression::StringLiteral(_) => Ok(Some(SqlType::String)),

            Expression::ColumnRef(column) => self.resolve_column(column).map(Some),

            Expression::ArithmeticBinary { op, left, right } => {
                let left_type = self.resolve_opt(left)?;
                let right_type = self.resolve_opt(right)?;
                match (left_type, right_type) {
                    (Some(l), Some(r)) => SqlType::resolve_arithmetic(&l, &r, *op).map(Some),
                    (Some(t), None) | (None, Some(t)) if t.is_numeric() => Ok(Some(t)),
                    (Some(t), None) | (None, Some(t)) => Err(
                        RapidsError::arithmetic_type_mismatch(format!(
                            "unsupported operand type {} for '{}'",
                            t, op
                        )),
                    ),
                    (None, None) => Err(RapidsError::arithmetic_type_mismatch(format!(
                        "cannot apply '{}' to NULL operands",
                        op
                    ))),
                }
            }

            Expression::ArithmeticUnary { expr, .. } => match self.resolve_opt(expr)? {
                None => Ok(None),
                Some(t) if t.is_numeric() => Ok(Some(t)),
                Some(t) => Err(RapidsError::arithmetic_type_mismatch(format!(
                    "cannot negate {}",
                    t
                ))),
            },

            Expression::Comparison { op, left, right } => {
                let left_type = self.resolve_opt(left)?;
                let right_type = self.resolve_opt(right)?;
                if let (Some(l), Some(r)) = (&left_type, &right_type) {
                    if !l.comparable_with(r, *op) {
                        return Err(RapidsError::incomparable_types(format!(
                            "cannot compare {} ({}) {} {} ({})",
                            left, l, op, right, r
                        )));
                    }
                }
                Ok(Some(SqlType::Boolean))
            }

            Expression::Logical { left, right, .. } => {
                self.expect_boolean(left)?;
                self.expect_boolean(right)?;
                Ok(Some(SqlType::Boolean))
            }

            Expression::Not(inner) => {
                self.expect_boolean(inner)?;
                Ok(Some(SqlType::Boolean))
            }

            Expression::IsNull(inner) | Expression::IsNotNull(inner) => {
                self.resolve_opt(inner)?;
                Ok(Some(SqlType::Boolean))
            }

            Expression::Between {
                value, min, max, ..
            } => {
                let value_type = self.resolve_opt(value)?;
                for bound in [min, max] {
                    let bound_type = self.resolve_opt(bound)?;
                    if let (Some(v), Some(b)) = (&value_type, &bound_type) {
                        if !v.comparable_with(b, ComparisonOp::LtEq) {
                            return Err(RapidsError::incomparable_types(format!(
                                "BETWEEN bound {} ({}) is not comparable with {} ({})",
                                bound, b, value, v
                            )));
                        }
                    }
                }
                Ok(Some(SqlType::Boolean))
            }

            Expression::Like { value, pattern, .. } => {
                for side in [value, pattern] {
                    match self.resolve_opt(side)? {
                        None | Some(SqlType::String) => {}
                        Some(t) => {
                            return Err(RapidsError::type_mismatch(format!(
                                "LIKE requires STRING operands, {} is {}",
                                side, t
                            )))
                        }
                    }
                }
                Ok(Some(SqlType::Boolean))
            }

            Expression::InList { value, list, .. } => {
                let value_type = self.resolve_opt(value)?;
                for item in list {
                    let item_type = self.resolve_opt(item)?;
                    if let (Some(v), Some(i)) = (&value_type, &item_type) {
                        if !v.comparable_with(i, ComparisonOp::Eq) {
                            return Err(RapidsError::incomparable_types(format!(
                                "IN list item {} ({}) is not comparable with {} ({})",
                                item, i, value, v
                            )));
                        }
                    }
                }
                Ok(Some(SqlType::Boolean))
            }

            Expression::Cast { expr, target } => {
                match self.resolve_opt(expr)? {
                    None => {}
                    Some(source) => {
                        if !source.castable_to(target) {
                            return Err(RapidsError::cast_not_supported(format!(
                                "cannot cast {} to {}",
                                source, target
                            )));
                        }
                    }
                }
                Ok(Some(target.clone()))
            }

            Expression::Subscript { base, index } => {
                let base_type = self.resolve(base)?;
                let index_type = self.resolve_opt(index)?;
                match base_type {
                    SqlType::Array(element) => {
                        if let Some(t) = index_type {
                            if !t.is_integer() {
                                return Err(RapidsError::type_mismatch(format!(
                                    "ARRAY index must be an integer, got {}",
                                    t
                                )));
                            }
                        }
                        Ok(Some(*element))
                    }
                    SqlType::Map(value) => {
                        if let Some(t) = index_type {
                            if t != SqlType::String {
                                return Err(RapidsError::type_mismatch(format!(
                                    "MAP key must be STRING, got {}",
                                    t
                                )));
                            }
                        }
                        Ok(Some(*value))
                    }
                    other => Err(RapidsError::subscript_base(format!(
                        "{} is of type {}",
                        base, other
                    ))),
                }
            }

            Expression::Dereference { base, field } => match self.resolve(base)? {
                SqlType::Struct(fields) => fields
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, t)| Some(t.clone()))
                    .ok_or_else(|| {
                        RapidsError::dereference_unresolved(format!(
                            "no field '{}' in {}",
                            field, base
                        ))
                    }),
                other => Err(RapidsError::type_mismatch(format!(
                    "cannot dereference {} of type {}",
                    base, other
                ))),
            },

            Expression::FunctionCall { name, args } => {
                if self.functions.is_aggregate(name) {
                    let arg_type = match args.first() {
                        Some(arg) => self.resolve_opt(arg)?.unwrap_or(SqlType::Bigint),
                        None => SqlType::Bigint,
                    };
                    let descriptor = self.functions.aggregate(name, &arg_type)?;
                    return Ok(Some(descriptor.return_type().clone()));
                }

                let arg_types = args
                    .iter()
                    .map(|arg| Ok(self.resolve_opt(arg)?.unwrap_or(SqlType::String)))
                    .collect::<Result<Vec<_>>>()?;
                let descriptor = self.functions.scalar(name, &arg_types)?;
                Ok(Some(descriptor.return_type().clone()))
            }

            Expression::SearchedCase {
                when_clauses,
                default,
            } => {
                for clause in when_clauses {
                    match self.resolve_opt(&clause.operand)? {
                        None | Some(SqlType::Boolean) => {}
                        Some(t) => {
                            return Err(RapidsError::case_type_mismatch(format!(
                                "WHEN operand {} should be BOOLEAN, is {}",
                                clause.operand, t
                            )))
                        }
                    }
                }
                self.resolve_case_results(when_clauses, default)
            }

            Expression::SimpleCase {
                operand,
                when_clauses,
                default,
            } => {
                let operand_type = self.resolve_opt(operand)?;
                for clause in when_clauses {
                    let when_type = self.resolve_opt(&clause.operand)?;
                    if let (Some(o), Some(w)) = (&operand_type, &when_type) {
                        if !o.comparable_with(w, ComparisonOp::Eq) {
                            return Err(RapidsError::case_type_mismatch(format!(
                                "WHEN value {} ({}) is not comparable with {} ({})",
                                clause.operand, w, operand, o
                            )));
                        }
                    }
                }
                self.resolve_case_results(when_clauses, default)
            }
        }
    }

    /// All THEN results and the ELSE must agree on a single type.
    fn resolve_case_results(
        &self,
        when_clauses: &[WhenClause],
        default: &Option<Box<Expression>>,
    ) -> Result<Option<SqlType>> {
        let mut result: Option<SqlType> = None;

        let results = when_clauses
            .iter()
            .map(|clause| &clause.result)
            .chain(default.iter().map(|d| d.as_ref()));

        for expr in results {
            let Some(t) = self.resolve_opt(expr)? else {
                continue;
            };
            match &result {
                None => result = Some(t),
                Some(expected) if *expected == t => {}
                Some(expected) => {
                    return Err(RapidsError::case_type_mismatch(format!(
                        "result {} is {}, expected {}",
                        expr, t, expected
                    )))
                }
            }
        }

        Ok(result)
    }

    fn resolve_column(&self, column: &ColumnRef) -> Result<SqlType> {
        let target = column.qualified_name();
        self.schema
            .find_value_column(&target)
            .map(|c| c.sql_type().clone())
            .ok_or_else(|| {
                RapidsError::unknown_column_with_suggestions(
                    &target,
                    &self.schema.value_column_names(),
                )
            })
    }

    fn expect_boolean(&self, expr: &Expression) -> Result<()> {
        match self.resolve_opt(expr)? {
            None | Some(SqlType::Boolean) => Ok(()),
            Some(t) => Err(RapidsError::type_mismatch(format!(
                "expected BOOLEAN, {} is {}",
                expr, t
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::CoreFunctionRegistry;
    use crate::schema::ColumnName;
    use crate::types::ArithmeticOp;

    fn test_schema() -> LogicalSchema {
        LogicalSchema::builder()
            .value_column(ColumnName::of("i"), SqlType::Integer)
            .value_column(ColumnName::of("l"), SqlType::Bigint)
            .value_column(ColumnName::of("d"), SqlType::Double)
            .value_column(ColumnName::of("s"), SqlType::String)
            .value_column(ColumnName::of("b"), SqlType::Boolean)
            .value_column(ColumnName::of("dec"), SqlType::decimal(6, 2).unwrap())
            .value_column(ColumnName::of("arr"), SqlType::array(SqlType::String))
            .value_column(ColumnName::of("m"), SqlType::map(SqlType::Integer))
            .value_column(
                ColumnName::of("st"),
                SqlType::Struct(vec![("inner".into(), SqlType::Bigint)]),
            )
            .build()
            .unwrap()
    }

    fn resolve(expr: &Expression) -> Result<SqlType> {
        let schema = test_schema();
        let registry = CoreFunctionRegistry::new();
        TypeResolver::new(&schema, &registry).resolve(expr)
    }

    #[test]
    fn test_literals() {
        assert_eq!(resolve(&Expression::integer(1)).unwrap(), SqlType::Integer);
        assert_eq!(resolve(&Expression::long(1)).unwrap(), SqlType::Bigint);
        assert_eq!(resolve(&Expression::string("x")).unwrap(), SqlType::String);
        assert!(resolve(&Expression::null()).is_err());
    }

    #[test]
    fn test_column_resolution() {
        assert_eq!(resolve(&Expression::column("i")).unwrap(), SqlType::Integer);

        let err = resolve(&Expression::column("missing"));
        assert!(matches!(err, Err(RapidsError::UnknownColumn { .. })));
    }

    #[test]
    fn test_arithmetic_promotion() {
        let expr = Expression::column("i").arithmetic(ArithmeticOp::Add, Expression::column("l"));
        assert_eq!(resolve(&expr).unwrap(), SqlType::Bigint);

        let expr = Expression::column("dec").arithmetic(ArithmeticOp::Add, Expression::column("i"));
        assert_eq!(resolve(&expr).unwrap(), SqlType::decimal(13, 2).unwrap());

        let expr = Expression::column("dec").arithmetic(ArithmeticOp::Add, Expression::column("d"));
        assert_eq!(resolve(&expr).unwrap(), SqlType::Double);
    }

    #[test]
    fn test_string_arithmetic_rejected() {
        let expr = Expression::column("s").arithmetic(ArithmeticOp::Add, Expression::column("i"));
        assert!(matches!(
            resolve(&expr),
            Err(RapidsError::ArithmeticTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_comparisons() {
        let expr = Expression::column("i").gt(Expression::column("d"));
        assert_eq!(resolve(&expr).unwrap(), SqlType::Boolean);

        let expr = Expression::column("dec").lt(Expression::column("l"));
        assert_eq!(resolve(&expr).unwrap(), SqlType::Boolean);

        let expr = Expression::column("s").eq(Expression::column("i"));
        assert!(matches!(
            resolve(&expr),
            Err(RapidsError::ComparisonIncompatibleTypes { .. })
        ));
    }

    #[test]
    fn test_null_comparison_is_boolean() {
        let expr = Expression::column("i").eq(Expression::null());
        assert_eq!(resolve(&expr).unwrap(), SqlType::Boolean);
    }

    #[test]
    fn test_cast() {
        let expr = Expression::Cast {
            expr: Box::new(Expression::column("s")),
            target: SqlType::Boolean,
        };
        assert_eq!(resolve(&expr).unwrap(), SqlType::Boolean);

        let expr = Expression::Cast {
            expr: Box::new(Expression::column("st")),
            target: SqlType::String,
        };
        assert!(matches!(
            resolve(&expr),
            Err(RapidsError::CastNotSupported { .. })
        ));
    }

    #[test]
    fn test_subscript() {
        let expr = Expression::Subscript {
            base: Box::new(Expression::column("arr")),
            index: Box::new(Expression::integer(0)),
        };
        assert_eq!(resolve(&expr).unwrap(), SqlType::String);

        let expr = Expression::Subscript {
            base: Box::new(Expression::column("m")),
            index: Box::new(Expression::string("k")),
        };
        assert_eq!(resolve(&expr).unwrap(), SqlType::Integer);

        let expr = Expression::Subscript {
            base: Box::new(Expression::column("m")),
            index: Box::new(Expression::integer(0)),
        };
        assert!(matches!(resolve(&expr), Err(RapidsError::TypeMismatch { .. })));

        let expr = Expression::Subscript {
            base: Box::new(Expression::column("i")),
            index: Box::new(Expression::integer(0)),
        };
        assert!(matches!(
            resolve(&expr),
            Err(RapidsError::SubscriptBaseNotContainer { .. })
        ));
    }

    #[test]
    fn test_dereference() {
        let expr = Expression::Dereference {
            base: Box::new(Expression::column("st")),
            field: "inner".into(),
        };
        assert_eq!(resolve(&expr).unwrap(), SqlType::Bigint);

        let expr = Expression::Dereference {
            base: Box::new(Expression::column("st")),
            field: "nope".into(),
        };
        assert!(matches!(
            resolve(&expr),
            Err(RapidsError::DereferenceUnresolved { .. })
        ));
    }

    #[test]
    fn test_searched_case() {
        use crate::expr::WhenClause;

        let valid = Expression::SearchedCase {
            when_clauses: vec![WhenClause::new(
                Expression::column("i").gt(Expression::integer(0)),
                Expression::string("pos"),
            )],
            default: Some(Box::new(Expression::string("neg"))),
        };
        assert_eq!(resolve(&valid).unwrap(), SqlType::String);

        let bad_when = Expression::SearchedCase {
            when_clauses: vec![WhenClause::new(
                Expression::column("i"),
                Expression::string("pos"),
            )],
            default: None,
        };
        assert!(matches!(
            resolve(&bad_when),
            Err(RapidsError::CaseTypeMismatch { .. })
        ));

        let mismatched_results = Expression::SearchedCase {
            when_clauses: vec![WhenClause::new(
                Expression::column("b"),
                Expression::string("pos"),
            )],
            default: Some(Box::new(Expression::integer(0))),
        };
        assert!(matches!(
            resolve(&mismatched_results),
            Err(RapidsError::CaseTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_function_calls() {
        let expr = Expression::function("UCASE", vec![Expression::column("s")]);
        assert_eq!(resolve(&expr).unwrap(), SqlType::String);

        let expr = Expression::function("COUNT", vec![Expression::column("i")]);
        assert_eq!(resolve(&expr).unwrap(), SqlType::Bigint);

        let expr = Expression::function("SUM", vec![Expression::column("d")]);
        assert_eq!(resolve(&expr).unwrap(), SqlType::Double);

        let expr = Expression::function("NOPE", vec![]);
        assert!(matches!(
            resolve(&expr),
            Err(RapidsError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_logical_requires_boolean() {
        let expr = Expression::column("b").and(Expression::column("b"));
        assert_eq!(resolve(&expr).unwrap(), SqlType::Boolean);

        let expr = Expression::column("i").and(Expression::column("b"));
        assert!(matches!(resolve(&expr), Err(RapidsError::TypeMismatch { .. })));
    }
}
