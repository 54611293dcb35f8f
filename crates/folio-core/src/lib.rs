//! Folio Core - command pipeline, query engine and content store.
//!
//! Every repository operation is a [`Command`](proto::Command) sent through a
//! [`Pipeline`] of [`Stage`]s together with an [`InvocationContext`]. Queries
//! are run by the [`QueryEngine`] in timed phases (parse, plan, optimize,
//! execute) and report [`Statistics`] for each phase.
//!
//! ```no_run
//! use folio_core::{InvocationContext, Repository, RepositoryConfig};
//!
//! let repo = Repository::open(RepositoryConfig::default())?;
//! let mut ctx = InvocationContext::anonymous();
//! let results = repo.query(&mut ctx, "SELECT cmis:name FROM cmis:document")?;
//! println!("{} rows in {:?}", results.result_set.len(), results.statistics.total());
//! # Ok::<(), folio_core::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod repository;
pub mod stages;
pub mod storage;

pub use catalog::{PropertyDef, PropertyType, TypeCatalog, TypeDef};
pub use config::{EngineConfig, RepositoryConfig};
pub use context::{CancelToken, InvocationContext, Problem, Problems, Session, TransactionScope};
pub use error::{BoxError, Error};
pub use pipeline::{ForwardingStage, Next, Pipeline, QueryResults, Reply, Stage};
pub use query::{
    CatalogPlanner, CmisSqlParser, ExecutionPlan, ExecutionResult, QueryEngine, QueryOptimizer,
    QueryOutcome, QueryPhase, QueryPlanner, QueryProcessor, QueryRun, RuleOptimizer,
    StatementParser, Statistics, StoreProcessor,
};
pub use repository::Repository;
pub use stages::{QueryStage, StatementStage, StoreStage, TracingStage, UnitOfWorkStage};
pub use storage::{ContentStore, SledContentStore, StorageConfig};

/// Re-export protocol types.
pub use folio_proto as proto;
