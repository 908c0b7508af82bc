//! Rapids - Streaming SQL Planning Engine
//!
//! Rapids is the logical planning core of a streaming SQL engine. It
//! compiles statements over continuously updating streams and tables into
//! an immutable dataflow plan executed on top of a record-oriented,
//! partitioned pub/sub substrate.
//!
//! The crate owns three concerns:
//!
//! - **Logical schemas** - typed key/value/metadata columns, alias
//!   qualification, and the `ROWTIME` / `ROWKEY` projections
//! - **The expression algebra** - an immutable SQL expression tree, type
//!   inference, canonicalizing rewrites, and compilation to row-level
//!   evaluators
//! - **The plan algebra** - sources, projections, filters, grouping and
//!   windowed aggregation, the three stream/table joiners, repartitioning,
//!   and sinks, with the partition key tracked through every node
//!
//! Parsing, serialization, topic administration, and the execution runtime
//! are external collaborators; the planner is pure, synchronous, and
//! deterministic — the same statement, catalog, and function registry
//! always produce an equal plan.
//!
//! # Quick Start
//!
//! ```rust
//! use rapids::catalog::{MemoryCatalog, Source};
//! use rapids::expr::Expression;
//! use rapids::function::CoreFunctionRegistry;
//! use rapids::plan::{KeyField, NodeType, Stacker};
//! use rapids::schema::{ColumnName, LogicalSchema, SourceName};
//! use rapids::types::SqlType;
//! use rapids::{Planner, PlannerConfig, Result};
//!
//! fn main() -> Result<()> {
//!     let schema = LogicalSchema::builder()
//!         .value_column(ColumnName::of("a"), SqlType::Integer)
//!         .value_column(ColumnName::of("b"), SqlType::String)
//!         .build()?;
//!
//!     let catalog = MemoryCatalog::new();
//!     catalog.register(
//!         Source::builder(SourceName::of("S"), NodeType::Stream, schema)
//!             .key_field(KeyField::of(ColumnName::of("a")))
//!             .partition_count(4)
//!             .build(),
//!     );
//!
//!     let registry = CoreFunctionRegistry::new();
//!     let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
//!
//!     let stacker = Stacker::new();
//!     let builder = planner.builder();
//!     let source = builder.source(&SourceName::of("S"), None, &stacker)?;
//!     let filtered = builder.filter(
//!         source,
//!         Expression::column("a").gt(Expression::integer(10)),
//!         &stacker,
//!     )?;
//!
//!     println!("{}", filtered);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod codegen;
mod config;
mod error;
pub mod expr;
pub mod function;
pub mod insert;
pub mod plan;
pub mod schema;
pub mod types;
pub mod util;

pub use config::PlannerConfig;
pub use error::{Location, RapidsError, Result};

use catalog::Catalog;
use function::FunctionRegistry;
use insert::{Clock, InsertRequest, InsertRow, InsertValuesPlanner, SystemClock};
use plan::PlanBuilder;

/// Entry point tying the catalog, function registry, and configuration
/// together.
pub struct Planner<'a> {
    catalog: &'a dyn Catalog,
    functions: &'a dyn FunctionRegistry,
    config: PlannerConfig,
    clock: &'a dyn Clock,
}

const SYSTEM_CLOCK: SystemClock = SystemClock;

impl<'a> Planner<'a> {
    /// Create a planner using the system clock.
    pub fn new(
        catalog: &'a dyn Catalog,
        functions: &'a dyn FunctionRegistry,
        config: PlannerConfig,
    ) -> Self {
        Self {
            catalog,
            functions,
            config,
            clock: &SYSTEM_CLOCK,
        }
    }

    /// Replace the clock used to stamp insert-values rows.
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// A plan builder over this planner's collaborators.
    pub fn builder(&self) -> PlanBuilder<'_> {
        PlanBuilder::new(self.catalog, self.functions, &self.config)
    }

    /// Plan an `INSERT INTO ... VALUES` statement.
    pub fn insert_values(&self, request: &InsertRequest) -> Result<InsertRow> {
        InsertValuesPlanner::new(self.catalog, &self.config, self.clock).plan(request)
    }
}
