//! Query engine for Folio.
//!
//! Statements are parsed into a [`folio_proto::QueryModel`], planned against
//! the type catalog, optimized and executed against the content store. Each
//! step sits behind a trait so the engine can be assembled from other
//! collaborators.

mod engine;
mod filter;
mod optimizer;
mod parser;
mod plan;
mod planner;
mod processor;
mod statistics;

pub use engine::{QueryEngine, QueryOutcome, QueryPhase, QueryRun};
pub use filter::FilterEvaluator;
pub use optimizer::{QueryOptimizer, RuleOptimizer};
pub use parser::{CmisSqlParser, StatementError, StatementParser};
pub use plan::{ExecutionPlan, PlanNode};
pub use planner::{CatalogPlanner, QueryPlanner};
pub use processor::{ExecutionResult, QueryProcessor, StoreProcessor};
pub use statistics::Statistics;
