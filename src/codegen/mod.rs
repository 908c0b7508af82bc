//! Expression code generation.
//!
//! Lowers a type-checked expression into a [`CompiledExpression`]: a
//! row-level evaluator plus the minimal set of required columns and one
//! function instance per call site.

mod like;
mod row_expr;

pub use like::LikePattern;
pub use row_expr::RowExpr;

use std::sync::Arc;

use crate::error::{RapidsError, Result};
use crate::expr::{Expression, LogicalOp, Sign, TypeResolver, WhenClause};
use crate::function::FunctionRegistry;
use crate::schema::LogicalSchema;
use crate::types::{Row, SqlType, Value};

use row_expr::{
    ArithmeticExpr, BetweenExpr, CaseExpr, CastExpr, ColumnExpr, ComparisonExpr, DereferenceExpr,
    FunctionExpr, InListExpr, LikeExpr, LiteralExpr, LogicalExpr, NegateExpr, NotExpr,
    NullCheckExpr, SubscriptExpr,
};

/// A required input column of a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// The column's full name in the source schema
    pub full_name: String,
    /// Positional index within the schema's value columns
    pub index: usize,
}

/// A compiled, immediately-evaluable expression.
#[derive(Debug)]
pub struct CompiledExpression {
    expression: Expression,
    return_type: SqlType,
    parameters: Vec<Parameter>,
    evaluator: Arc<dyn RowExpr>,
}

impl CompiledExpression {
    /// Evaluate against a row sized to the schema's value-column count.
    pub fn evaluate(&self, row: &Row) -> Result<Value> {
        self.evaluator.evaluate(row)
    }

    /// The inferred result type.
    pub fn return_type(&self) -> &SqlType {
        &self.return_type
    }

    /// The distinct required columns, in first-reference order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// The source expression this was compiled from.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// Compiles expressions against one schema and function registry.
pub struct CodeGen<'a> {
    schema: &'a LogicalSchema,
    functions: &'a dyn FunctionRegistry,
}

impl<'a> CodeGen<'a> {
    /// Create a compiler for a schema.
    pub fn new(schema: &'a LogicalSchema, functions: &'a dyn FunctionRegistry) -> Self {
        Self { schema, functions }
    }

    /// Compile one expression.
    ///
    /// Type inference runs first; compilation fails exactly when inference
    /// fails, with the same error kind for the same root cause.
    pub fn compile(&self, expression: &Expression) -> Result<CompiledExpression> {
        let resolver = TypeResolver::new(self.schema, self.functions);
        let return_type = resolver.resolve(expression)?;

        let parameters = self.collect_parameters(expression)?;

        let mut site_counter = 0usize;
        let evaluator = self.lower(expression, &resolver, &mut site_counter)?;

        Ok(CompiledExpression {
            expression: expression.clone(),
            return_type,
            parameters,
            evaluator,
        })
    }

    /// Compile several expressions against the same schema.
    pub fn compile_all(&self, expressions: &[Expression]) -> Result<Vec<CompiledExpression>> {
        expressions.iter().map(|e| self.compile(e)).collect()
    }

    fn collect_parameters(&self, expression: &Expression) -> Result<Vec<Parameter>> {
        let mut parameters: Vec<Parameter> = Vec::new();
        for column in expression.columns() {
            let full_name = column.qualified_name();
            if parameters.iter().any(|p| p.full_name == full_name) {
                continue;
            }
            let index = self.schema.value_column_index(&full_name).ok_or_else(|| {
                RapidsError::unknown_column_with_suggestions(
                    &full_name,
                    &self.schema.value_column_names(),
                )
            })?;
            parameters.push(Parameter {
                full_name,
                index: index as usize,
            });
        }
        Ok(parameters)
    }

    fn lower(
        &self,
        expression: &Expression,
        resolver: &TypeResolver<'_>,
        site_counter: &mut usize,
    ) -> Result<Arc<dyn RowExpr>> {
        Ok(match expression {
            Expression::NullLiteral
            | Expression::BooleanLiteral(_)
            | Expression::IntegerLiteral(_)
            | Expression::LongLiteral(_)
            | Expression::DoubleLiteral(_)
            | Expression::DecimalLiteral { .. }
            | Expression::StringLiteral(_) => {
                let value = expression
                    .literal_value()
                    .expect("literal variants carry values");
                let sql_type = value.data_type().unwrap_or(SqlType::String);
                Arc::new(LiteralExpr::new(value, sql_type))
            }

            Expression::ColumnRef(column) => {
                let full_name = column.qualified_name();
                let index = self
                    .schema
                    .value_column_index(&full_name)
                    .expect("type inference resolved this column") as usize;
                let sql_type = resolver.resolve(expression)?;
                Arc::new(ColumnExpr::new(full_name, index, sql_type))
            }

            Expression::ArithmeticBinary { op, left, right } => {
                let result_type = resolver.resolve(expression)?;
                Arc::new(ArithmeticExpr::new(
                    *op,
                    self.lower(left, resolver, site_counter)?,
                    self.lower(right, resolver, site_counter)?,
                    result_type,
                ))
            }

            Expression::ArithmeticUnary { sign, expr } => Arc::new(NegateExpr::new(
                *sign == Sign::Minus,
                self.lower(expr, resolver, site_counter)?,
            )),

            Expression::Comparison { op, left, right } => Arc::new(ComparisonExpr::new(
                *op,
                self.lower(left, resolver, site_counter)?,
                self.lower(right, resolver, site_counter)?,
            )),

            Expression::Logical { op, left, right } => Arc::new(LogicalExpr::new(
                *op == LogicalOp::And,
                self.lower(left, resolver, site_counter)?,
                self.lower(right, resolver, site_counter)?,
            )),

            Expression::Not(inner) => {
                Arc::new(NotExpr::new(self.lower(inner, resolver, site_counter)?))
            }

            Expression::IsNull(inner) => Arc::new(NullCheckExpr::new(
                false,
                self.lower(inner, resolver, site_counter)?,
            )),

            Expression::IsNotNull(inner) => Arc::new(NullCheckExpr::new(
                true,
                self.lower(inner, resolver, site_counter)?,
            )),

            Expression::Between {
                value,
                min,
                max,
                negated,
            } => Arc::new(BetweenExpr::new(
                self.lower(value, resolver, site_counter)?,
                self.lower(min, resolver, site_counter)?,
                self.lower(max, resolver, site_counter)?,
                *negated,
            )),

            Expression::Like {
                value,
                pattern,
                negated,
            } => {
                let Expression::StringLiteral(pattern_text) = pattern.as_ref() else {
                    return Err(RapidsError::type_mismatch(format!(
                        "LIKE pattern must be a string literal, got {}",
                        pattern
                    )));
                };
                Arc::new(LikeExpr::new(
                    self.lower(value, resolver, site_counter)?,
                    LikePattern::compile(pattern_text)?,
                    *negated,
                ))
            }

            Expression::InList {
                value,
                list,
                negated,
            } => Arc::new(InListExpr::new(
                self.lower(value, resolver, site_counter)?,
                list.iter()
                    .map(|item| self.lower(item, resolver, site_counter))
                    .collect::<Result<_>>()?,
                *negated,
            )),

            Expression::Cast { expr, target } => Arc::new(CastExpr::new(
                self.lower(expr, resolver, site_counter)?,
                target.clone(),
            )),

            Expression::Subscript { base, index } => {
                let result_type = resolver.resolve(expression)?;
                Arc::new(SubscriptExpr::new(
                    self.lower(base, resolver, site_counter)?,
                    self.lower(index, resolver, site_counter)?,
                    result_type,
                ))
            }

            Expression::Dereference { base, field } => {
                let result_type = resolver.resolve(expression)?;
                Arc::new(DereferenceExpr::new(
                    self.lower(base, resolver, site_counter)?,
                    field.clone(),
                    result_type,
                ))
            }

            Expression::FunctionCall { name, args } => {
                if self.functions.is_aggregate(name) {
                    return Err(RapidsError::type_mismatch(format!(
                        "aggregate function {} cannot be evaluated per row",
                        name
                    )));
                }

                let site = *site_counter;
                *site_counter += 1;

                let arg_types = args
                    .iter()
                    .map(|arg| Ok(resolver.resolve_opt(arg)?.unwrap_or(SqlType::String)))
                    .collect::<Result<Vec<_>>>()?;
                let descriptor = self.functions.scalar(name, &arg_types)?;

                let lowered_args = args
                    .iter()
                    .map(|arg| self.lower(arg, resolver, site_counter))
                    .collect::<Result<Vec<_>>>()?;

                Arc::new(FunctionExpr::new(
                    format!("{}_{}", descriptor.name(), site),
                    descriptor.instantiate(),
                    lowered_args,
                    descriptor.return_type().clone(),
                ))
            }

            Expression::SearchedCase {
                when_clauses,
                default,
            } => {
                let result_type = resolver.resolve(expression)?;
                Arc::new(CaseExpr::new(
                    None,
                    self.lower_when_clauses(when_clauses, resolver, site_counter)?,
                    self.lower_default(default, resolver, site_counter)?,
                    result_type,
                ))
            }

            Expression::SimpleCase {
                operand,
                when_clauses,
                default,
            } => {
                let result_type = resolver.resolve(expression)?;
                Arc::new(CaseExpr::new(
                    Some(self.lower(operand, resolver, site_counter)?),
                    self.lower_when_clauses(when_clauses, resolver, site_counter)?,
                    self.lower_default(default, resolver, site_counter)?,
                    result_type,
                ))
            }
        })
    }

    fn lower_when_clauses(
        &self,
        when_clauses: &[WhenClause],
        resolver: &TypeResolver<'_>,
        site_counter: &mut usize,
    ) -> Result<Vec<(Arc<dyn RowExpr>, Arc<dyn RowExpr>)>> {
        when_clauses
            .iter()
            .map(|clause| {
                Ok((
                    self.lower(&clause.operand, resolver, site_counter)?,
                    self.lower(&clause.result, resolver, site_counter)?,
                ))
            })
            .collect()
    }

    fn lower_default(
        &self,
        default: &Option<Box<Expression>>,
        resolver: &TypeResolver<'_>,
        site_counter: &mut usize,
    ) -> Result<Option<Arc<dyn RowExpr>>> {
        default
            .as_ref()
            .map(|d| self.lower(d, resolver, site_counter))
            .transpose()
    }
}
