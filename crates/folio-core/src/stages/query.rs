//! Query handling through the [`QueryEngine`].

use std::sync::Arc;

use folio_proto::{ParseStatement, ProcessQuery};

use crate::context::InvocationContext;
use crate::error::Error;
use crate::pipeline::{Next, QueryResults, Reply, Stage};
use crate::query::{QueryEngine, QueryOutcome};

/// Answers `ParseStatement` and `ProcessQuery` using a query engine.
///
/// A run that halts at a checkpoint is reported as
/// [`Error::QueryHalted`] carrying the problems recorded in the context.
pub struct QueryStage {
    engine: Arc<QueryEngine>,
}

impl QueryStage {
    pub const KIND: &'static str = "query";

    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<QueryEngine> {
        &self.engine
    }
}

impl Stage for QueryStage {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn parse_statement(
        &self,
        ctx: &mut InvocationContext,
        command: &ParseStatement,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        let model = self
            .engine
            .parse(ctx, &command.statement, &command.statement_type)?;
        Ok(Reply::Parsed(model))
    }

    fn process_query(
        &self,
        ctx: &mut InvocationContext,
        command: &ProcessQuery,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        let run = self.engine.process(ctx, &command.model)?;
        match run.outcome {
            QueryOutcome::Completed(result_set) => Ok(Reply::Query(QueryResults {
                result_set,
                statistics: run.statistics,
            })),
            QueryOutcome::Halted { after } => Err(Error::QueryHalted {
                phase: after,
                problems: ctx.problems().as_slice().to_vec(),
            }),
        }
    }
}
