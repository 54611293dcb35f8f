//! Built-in pipeline stages.
//!
//! The default repository chain is, from entry to tail:
//!
//! | kind           | stage               |
//! |----------------|---------------------|
//! | `tracing`      | [`TracingStage`]    |
//! | `unit-of-work` | [`UnitOfWorkStage`] |
//! | `statement`    | [`StatementStage`]  |
//! | `query`        | [`QueryStage`]      |
//! | `store`        | [`StoreStage`]      |

mod query;
mod statement;
mod store;
mod tracing;
mod unit_of_work;

pub use self::query::QueryStage;
pub use self::statement::StatementStage;
pub use self::store::StoreStage;
pub use self::tracing::TracingStage;
pub use self::unit_of_work::UnitOfWorkStage;
