//! Statement submission.

use folio_proto::{Command, SubmitStatement};

use crate::context::InvocationContext;
use crate::error::Error;
use crate::pipeline::{Next, Reply, Stage};

/// Handles `SubmitStatement` by composing a `ParseStatement` sub-call and a
/// `ProcessQuery` sub-call, both sent through the whole pipeline.
///
/// Errors from either sub-call are returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct StatementStage;

impl StatementStage {
    pub const KIND: &'static str = "statement";

    pub fn new() -> Self {
        Self
    }
}

impl Stage for StatementStage {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn submit_statement(
        &self,
        ctx: &mut InvocationContext,
        command: &SubmitStatement,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        let parse = Command::parse_statement(
            command.statement.clone(),
            command.statement_type.clone(),
        );
        let model = match next.reenter(ctx, &parse)? {
            Reply::Parsed(model) => model,
            other => {
                return Err(Error::InvalidData(format!(
                    "parse_statement produced a {} reply",
                    other.name()
                )))
            }
        };
        next.reenter(ctx, &Command::process_query(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, QueryResults};
    use crate::query::Statistics;
    use folio_proto::{ParseStatement, ProcessQuery, QueryModel, ResultSet};
    use std::sync::Arc;

    /// Parses any statement to `SELECT * FROM <statement>` and answers
    /// queries with an empty result.
    struct FakeQuery;

    impl Stage for FakeQuery {
        fn kind(&self) -> &'static str {
            "fake-query"
        }

        fn parse_statement(
            &self,
            _ctx: &mut InvocationContext,
            command: &ParseStatement,
            _next: Next<'_>,
        ) -> Result<Reply, Error> {
            if command.statement.is_empty() {
                return Err(Error::InvalidQuery {
                    statement: String::new(),
                    source: "empty statement".into(),
                });
            }
            Ok(Reply::Parsed(QueryModel::select_all(&command.statement)))
        }

        fn process_query(
            &self,
            _ctx: &mut InvocationContext,
            command: &ProcessQuery,
            _next: Next<'_>,
        ) -> Result<Reply, Error> {
            Ok(Reply::Query(QueryResults {
                result_set: ResultSet::new(vec![command.model.source.clone()], vec![], false),
                statistics: Statistics::new(),
            }))
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::with_stages(vec![Arc::new(StatementStage::new()), Arc::new(FakeQuery)])
    }

    #[test]
    fn test_submit_composes_parse_and_process() {
        let mut ctx = InvocationContext::anonymous();
        let reply = pipeline()
            .invoke(&mut ctx, &Command::submit_statement("cmis:folder", "CMISQL"))
            .unwrap();

        let results = reply.into_query().unwrap();
        assert_eq!(results.result_set.columns, vec!["cmis:folder".to_string()]);
    }

    #[test]
    fn test_parse_error_passes_through() {
        let mut ctx = InvocationContext::anonymous();
        let err = pipeline()
            .invoke(&mut ctx, &Command::submit_statement("", "CMISQL"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_missing_parser_is_no_handler() {
        let pipeline = Pipeline::with_stages(vec![Arc::new(StatementStage::new())]);
        let mut ctx = InvocationContext::anonymous();
        let err = pipeline
            .invoke(&mut ctx, &Command::submit_statement("x", "CMISQL"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoHandler {
                command: folio_proto::CommandKind::ParseStatement
            }
        ));
    }
}
