//! Function registry collaborator contract.
//!
//! The planner resolves every function call through a [`FunctionRegistry`]:
//! scalar functions by name and argument types, aggregates by name and the
//! type of their single argument. Descriptors carry the inferred return
//! type and a factory for runtime instances — one instance is created per
//! call site during code generation.

mod builtin;

pub use builtin::CoreFunctionRegistry;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::schema::FunctionName;
use crate::types::{SqlType, Value};

/// Name of the pseudo-aggregate yielding the window's start time.
pub const WINDOW_START_NAME: &str = "WINDOWSTART";

/// Name of the pseudo-aggregate yielding the window's end time.
pub const WINDOW_END_NAME: &str = "WINDOWEND";

/// A runtime scalar function instance.
///
/// Instances may carry per-site state; evaluation must be deterministic
/// and side-effect free unless the function itself declares otherwise.
pub trait ScalarFunction: Send + Sync {
    /// Evaluate the function. Arguments may be null.
    fn evaluate(&self, args: &[Value]) -> Result<Value>;
}

/// A runtime aggregate function instance.
pub trait Aggregator: Send + Sync {
    /// The initial accumulator value.
    fn init(&self) -> Value;

    /// Fold one input value into the accumulator.
    fn accumulate(&self, accumulator: &Value, input: &Value) -> Value;

    /// Combine two accumulators (required for session windows).
    fn merge(&self, left: &Value, right: &Value) -> Value;
}

type ScalarFactory = Arc<dyn Fn() -> Arc<dyn ScalarFunction> + Send + Sync>;
type AggregateFactory = Arc<dyn Fn() -> Arc<dyn Aggregator> + Send + Sync>;

/// A resolved scalar function: return type plus instance factory.
#[derive(Clone)]
pub struct ScalarDescriptor {
    name: FunctionName,
    return_type: SqlType,
    factory: ScalarFactory,
}

impl ScalarDescriptor {
    /// Create a descriptor.
    pub fn new(name: FunctionName, return_type: SqlType, factory: ScalarFactory) -> Self {
        Self {
            name,
            return_type,
            factory,
        }
    }

    /// The canonical function name.
    pub fn name(&self) -> &FunctionName {
        &self.name
    }

    /// The inferred return type.
    pub fn return_type(&self) -> &SqlType {
        &self.return_type
    }

    /// Create a fresh runtime instance.
    pub fn instantiate(&self) -> Arc<dyn ScalarFunction> {
        (self.factory)()
    }
}

impl fmt::Debug for ScalarDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarDescriptor")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// A resolved aggregate function: return type plus instance factory.
#[derive(Clone)]
pub struct AggregateDescriptor {
    name: FunctionName,
    return_type: SqlType,
    factory: AggregateFactory,
}

impl AggregateDescriptor {
    /// Create a descriptor.
    pub fn new(name: FunctionName, return_type: SqlType, factory: AggregateFactory) -> Self {
        Self {
            name,
            return_type,
            factory,
        }
    }

    /// The canonical function name.
    pub fn name(&self) -> &FunctionName {
        &self.name
    }

    /// The inferred return type.
    pub fn return_type(&self) -> &SqlType {
        &self.return_type
    }

    /// Create a fresh runtime instance.
    pub fn instantiate(&self) -> Arc<dyn Aggregator> {
        (self.factory)()
    }

    /// Whether this is one of the window-bound pseudo-aggregates.
    pub fn is_window_bound(&self) -> bool {
        let canonical = self.name.canonical();
        canonical.as_str() == WINDOW_START_NAME || canonical.as_str() == WINDOW_END_NAME
    }
}

impl fmt::Debug for AggregateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateDescriptor")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// The planner's view of the function catalog.
///
/// Lookups are case-insensitive: names are folded to their canonical
/// (upper-case) form at this boundary and nowhere else.
pub trait FunctionRegistry: Send + Sync {
    /// Whether `name` resolves to an aggregate function.
    fn is_aggregate(&self, name: &FunctionName) -> bool;

    /// Resolve a scalar function for the given argument types.
    fn scalar(&self, name: &FunctionName, arg_types: &[SqlType]) -> Result<ScalarDescriptor>;

    /// Resolve an aggregate function for the given argument type.
    fn aggregate(&self, name: &FunctionName, arg_type: &SqlType) -> Result<AggregateDescriptor>;

    /// All registered function names, for error suggestions.
    fn function_names(&self) -> Vec<String>;
}
