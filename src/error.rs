//! Error types for the Rapids planning engine.
//!
//! Every failure in the core is surfaced as a typed [`RapidsError`]; the
//! planner never retries, logs-and-swallows, or terminates the process.

use std::fmt;

use strsim::jaro_winkler;
use thiserror::Error;

/// The primary error type for Rapids planning operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RapidsError {
    // ---- name / schema errors ----
    /// Two columns in the same namespace share a full name
    #[error("Duplicate column: {message}")]
    DuplicateColumn { message: String },

    /// A column reference did not resolve against the schema
    #[error("Unknown column: {message}")]
    UnknownColumn { message: String },

    /// A referenced source does not exist in the catalog
    #[error("Unknown source: {message}")]
    UnknownSource { message: String },

    /// An alias was applied to an already-aliased schema
    #[error("Schema is already aliased: {message}")]
    AlreadyAliased { message: String },

    /// An alias was removed from an unaliased schema
    #[error("Schema is not aliased: {message}")]
    NotAliased { message: String },

    // ---- type errors ----
    /// General type error
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },

    /// The requested cast pair is not supported
    #[error("Cast not supported: {message}")]
    CastNotSupported { message: String },

    /// CASE branches do not share a result type, or a WHEN is not boolean
    #[error("Invalid CASE expression: {message}")]
    CaseTypeMismatch { message: String },

    /// Operand types are not valid for an arithmetic operator
    #[error("Arithmetic type mismatch: {message}")]
    ArithmeticTypeMismatch { message: String },

    /// Operand types cannot be compared
    #[error("Incomparable types: {message}")]
    ComparisonIncompatibleTypes { message: String },

    /// Subscript applied to something that is not an ARRAY or MAP
    #[error("Subscript base is not a container: {message}")]
    SubscriptBaseNotContainer { message: String },

    // ---- expression errors ----
    /// A function name did not resolve through the registry
    #[error("Unknown function: {message}")]
    UnknownFunction { message: String },

    /// A function was called with the wrong number of arguments
    #[error("Function arity mismatch: {message}")]
    FunctionArityMismatch { message: String },

    /// A function was called with arguments of unsupported types
    #[error("Function signature mismatch: {message}")]
    FunctionSignatureMismatch { message: String },

    /// A string literal compared against the row-time column failed to parse
    #[error("Invalid timestamp literal: {message}")]
    InvalidTimestampLiteral { message: String },

    /// A struct dereference named a field that does not exist
    #[error("Cannot resolve dereference: {message}")]
    DereferenceUnresolved { message: String },

    // ---- plan errors ----
    /// The (left, right) source-type pair has no joiner
    #[error("Illegal join combination: {message}")]
    JoinCombinationIllegal { message: String },

    /// A stream-stream join is missing its WITHIN window
    #[error("WITHIN clause required: {message}")]
    WithinRequired { message: String },

    /// A WITHIN window was given for a non-windowed join
    #[error("WITHIN clause not allowed: {message}")]
    WithinForbidden { message: String },

    /// A table side of a join is keyed by neither the join field nor ROWKEY
    #[error("Table join key mismatch: {message}")]
    TableJoinKeyMismatch { message: String },

    /// Join sources have differing partition counts
    #[error("Partition count mismatch: {message}")]
    PartitionCountMismatch { message: String },

    /// The aggregate output schema does not match groups + aggregations
    #[error("Schema arity mismatch: {message}")]
    SchemaArityMismatch { message: String },

    // ---- insert errors ----
    /// INSERT ... VALUES was given a non-literal expression
    #[error("Invalid insert value: {message}")]
    InsertNonLiteral { message: String },

    /// An insert literal could not be coerced to its column type
    #[error("Insert type mismatch: {message}")]
    InsertTypeMismatch { message: String },

    /// The explicit key column and ROWKEY disagree
    #[error("Insert key mismatch: {message}")]
    InsertKeyMismatch { message: String },

    /// The insert target is a windowed source
    #[error("Cannot insert into windowed source: {message}")]
    InsertIntoWindowedNotAllowed { message: String },

    /// INSERT ... VALUES is disabled by configuration
    #[error("Insert values disabled: {message}")]
    InsertDisabled { message: String },

    // ---- other ----
    /// An argument violated a documented contract
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A compiled expression failed at evaluation time
    #[error("Evaluation error: {message}")]
    Eval { message: String },

    /// Internal invariant violation (a bug in the planner)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Location in the source statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

macro_rules! ctor {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident) => {
        $(#[$doc])*
        pub fn $fn_name(message: impl Into<String>) -> Self {
            Self::$variant {
                message: message.into(),
            }
        }
    };
}

impl RapidsError {
    ctor!(duplicate_column, DuplicateColumn);
    ctor!(unknown_column, UnknownColumn);
    ctor!(unknown_source, UnknownSource);
    ctor!(already_aliased, AlreadyAliased);
    ctor!(not_aliased, NotAliased);
    ctor!(type_mismatch, TypeMismatch);
    ctor!(cast_not_supported, CastNotSupported);
    ctor!(case_type_mismatch, CaseTypeMismatch);
    ctor!(arithmetic_type_mismatch, ArithmeticTypeMismatch);
    ctor!(incomparable_types, ComparisonIncompatibleTypes);
    ctor!(subscript_base, SubscriptBaseNotContainer);
    ctor!(unknown_function, UnknownFunction);
    ctor!(function_arity, FunctionArityMismatch);
    ctor!(function_signature, FunctionSignatureMismatch);
    ctor!(invalid_timestamp, InvalidTimestampLiteral);
    ctor!(dereference_unresolved, DereferenceUnresolved);
    ctor!(join_combination, JoinCombinationIllegal);
    ctor!(within_required, WithinRequired);
    ctor!(within_forbidden, WithinForbidden);
    ctor!(table_join_key, TableJoinKeyMismatch);
    ctor!(partition_count, PartitionCountMismatch);
    ctor!(schema_arity, SchemaArityMismatch);
    ctor!(insert_non_literal, InsertNonLiteral);
    ctor!(insert_type, InsertTypeMismatch);
    ctor!(insert_key, InsertKeyMismatch);
    ctor!(insert_windowed, InsertIntoWindowedNotAllowed);
    ctor!(insert_disabled, InsertDisabled);
    ctor!(invalid_argument, InvalidArgument);
    ctor!(eval, Eval);
    ctor!(internal, Internal);

    /// Attach a source location to this error's message.
    pub fn at(self, location: Location) -> Self {
        macro_rules! relocate {
            ($($variant:ident),+ $(,)?) => {
                match self {
                    $(Self::$variant { message } => Self::$variant {
                        message: format!("{} ({})", message, location),
                    },)+
                }
            };
        }

        relocate!(
            DuplicateColumn,
            UnknownColumn,
            UnknownSource,
            AlreadyAliased,
            NotAliased,
            TypeMismatch,
            CastNotSupported,
            CaseTypeMismatch,
            ArithmeticTypeMismatch,
            ComparisonIncompatibleTypes,
            SubscriptBaseNotContainer,
            UnknownFunction,
            FunctionArityMismatch,
            FunctionSignatureMismatch,
            InvalidTimestampLiteral,
            DereferenceUnresolved,
            JoinCombinationIllegal,
            WithinRequired,
            WithinForbidden,
            TableJoinKeyMismatch,
            PartitionCountMismatch,
            SchemaArityMismatch,
            InsertNonLiteral,
            InsertTypeMismatch,
            InsertKeyMismatch,
            InsertIntoWindowedNotAllowed,
            InsertDisabled,
            InvalidArgument,
            Eval,
            Internal,
        )
    }

    /// Create an unknown-column error with suggestions for similar names.
    pub fn unknown_column_with_suggestions(not_found: &str, available: &[String]) -> Self {
        Self::UnknownColumn {
            message: not_found_message("Column", not_found, available),
        }
    }

    /// Create an unknown-function error with suggestions for similar names.
    pub fn unknown_function_with_suggestions(not_found: &str, available: &[String]) -> Self {
        Self::UnknownFunction {
            message: not_found_message("Function", not_found, available),
        }
    }
}

fn not_found_message(entity: &str, not_found: &str, available: &[String]) -> String {
    let suggestions = find_similar_names(not_found, available, 3);
    let mut message = format!("{} '{}' not found", entity, not_found);

    if !suggestions.is_empty() {
        message.push_str(". Did you mean: ");
        message.push_str(&suggestions.join(", "));
        message.push('?');
    }

    message
}

/// Suggest likely-intended identifiers for a name that failed to resolve.
///
/// Scoring is case-insensitive Jaro-Winkler, so a wrong-case lookup still
/// surfaces the column it collided with even though resolution itself never
/// folds case. Candidates under the cutoff are dropped rather than offered
/// as wild guesses, and ties are broken by name so the suggestion list is
/// deterministic, like everything else the planner emits.
pub fn find_similar_names(
    target: &str,
    candidates: &[String],
    max_suggestions: usize,
) -> Vec<String> {
    const CUTOFF: f64 = 0.75;

    let target = target.to_lowercase();

    let mut ranked: Vec<(f64, &String)> = candidates
        .iter()
        .filter_map(|candidate| {
            let score = jaro_winkler(&target, &candidate.to_lowercase());
            (score >= CUTOFF).then_some((score, candidate))
        })
        .collect();

    ranked.sort_by(|(a_score, a), (b_score, b)| {
        b_score.total_cmp(a_score).then_with(|| a.cmp(b))
    });
    ranked.truncate(max_suggestions);

    ranked.into_iter().map(|(_, name)| name.clone()).collect()
}

/// Result type alias for Rapids operations.
pub type Result<T> = std::result::Result<T, RapidsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RapidsError::unknown_column("no such column 'x'");
        assert_eq!(err.to_string(), "Unknown column: no such column 'x'");
    }

    #[test]
    fn test_error_with_location() {
        let err =
            RapidsError::type_mismatch("expected BOOLEAN").at(Location { line: 3, column: 7 });
        assert_eq!(
            err.to_string(),
            "Type mismatch: expected BOOLEAN (line 3, column 7)"
        );
    }

    #[test]
    fn test_find_similar_names() {
        let columns = vec![
            "ROWTIME".to_string(),
            "ROWKEY".to_string(),
            "orderid".to_string(),
            "itemid".to_string(),
        ];

        let suggestions = find_similar_names("ROWTIM", &columns, 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("ROWTIME"));

        let suggestions = find_similar_names("ordrid", &columns, 3);
        assert!(suggestions.contains(&"orderid".to_string()));
        assert!(!suggestions.contains(&"ROWKEY".to_string()));

        assert!(find_similar_names("partition", &columns, 3).is_empty());
    }

    #[test]
    fn test_suggestions_are_deterministic() {
        // Equal scores fall back to name order, not candidate order.
        let columns = vec!["col2".to_string(), "col1".to_string()];
        assert_eq!(
            find_similar_names("col", &columns, 2),
            vec!["col1".to_string(), "col2".to_string()]
        );
    }

    #[test]
    fn test_unknown_column_suggestions() {
        let available = vec!["orderid".to_string(), "itemid".to_string()];
        let err = RapidsError::unknown_column_with_suggestions("ordrid", &available);
        let msg = err.to_string();
        assert!(msg.contains("Column 'ordrid' not found"));
        assert!(msg.contains("Did you mean"));
        assert!(msg.contains("orderid"));
    }
}
