//! Pipeline stages.
//!
//! A [`Stage`] receives every command that reaches its position in the
//! chain. The default [`Stage::handle`] dispatches on the command variant to
//! one method per command kind, and every one of those methods forwards the
//! same command to the next stage unless the stage overrides it. A stage
//! therefore only implements the kinds it cares about.
//!
//! Stages are shared between calls and must not keep per-call state; use the
//! [`InvocationContext`] for that.

use std::sync::Arc;

use folio_proto::{
    Command, ExecuteSelector, ModifyIndex, ParseStatement, ProcessQuery, ReadChildEntries,
    ReadContentEntry, ReadUnfiledEntries, SubmitStatement,
};

use super::reply::Reply;
use crate::context::InvocationContext;
use crate::error::Error;

/// A processing unit in a [`Pipeline`](super::Pipeline).
pub trait Stage: Send + Sync {
    /// Name used to address stages of this kind when editing a pipeline.
    fn kind(&self) -> &'static str;

    /// Handle a command.
    ///
    /// Override this only to observe every command regardless of kind; the
    /// per-kind methods are the usual extension point.
    fn handle(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        match command {
            Command::ReadChildEntries(c) => self.read_child_entries(ctx, c, next),
            Command::ReadContentEntry(c) => self.read_content_entry(ctx, c, next),
            Command::ReadUnfiledEntries(c) => self.read_unfiled_entries(ctx, c, next),
            Command::ModifyIndex(c) => self.modify_index(ctx, c, next),
            Command::ExecuteSelector(c) => self.execute_selector(ctx, c, next),
            Command::ProcessQuery(c) => self.process_query(ctx, c, next),
            Command::ParseStatement(c) => self.parse_statement(ctx, c, next),
            Command::SubmitStatement(c) => self.submit_statement(ctx, c, next),
            Command::Commit => self.commit(ctx, next),
            Command::RollBack => self.roll_back(ctx, next),
        }
    }

    fn read_child_entries(
        &self,
        ctx: &mut InvocationContext,
        _command: &ReadChildEntries,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn read_content_entry(
        &self,
        ctx: &mut InvocationContext,
        _command: &ReadContentEntry,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn read_unfiled_entries(
        &self,
        ctx: &mut InvocationContext,
        _command: &ReadUnfiledEntries,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn modify_index(
        &self,
        ctx: &mut InvocationContext,
        _command: &ModifyIndex,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn execute_selector(
        &self,
        ctx: &mut InvocationContext,
        _command: &ExecuteSelector,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn process_query(
        &self,
        ctx: &mut InvocationContext,
        _command: &ProcessQuery,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn parse_statement(
        &self,
        ctx: &mut InvocationContext,
        _command: &ParseStatement,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn submit_statement(
        &self,
        ctx: &mut InvocationContext,
        _command: &SubmitStatement,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn commit(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<Reply, Error> {
        next.forward(ctx)
    }

    fn roll_back(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<Reply, Error> {
        next.forward(ctx)
    }
}

/// The remainder of the chain after the current stage.
///
/// `Next` borrows the snapshot the call started with, so a pipeline edit made
/// while the call is running never changes where it goes.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Stage>],
    position: usize,
    command: &'a Command,
}

impl<'a> Next<'a> {
    /// Pass the command being handled on to the next stage.
    pub fn forward(self, ctx: &mut InvocationContext) -> Result<Reply, Error> {
        invoke_at(self.chain, self.position, ctx, self.command)
    }

    /// Send a different command to the next stage.
    pub fn invoke(self, ctx: &mut InvocationContext, command: &Command) -> Result<Reply, Error> {
        invoke_at(self.chain, self.position, ctx, command)
    }

    /// Send a command through the whole chain, starting at its entry stage.
    ///
    /// Used by stages that compose sub-calls; the caller must not re-enter
    /// with the command it is handling.
    pub fn reenter(self, ctx: &mut InvocationContext, command: &Command) -> Result<Reply, Error> {
        invoke_at(self.chain, 0, ctx, command)
    }
}

/// Dispatch `command` to the stage at `position`.
pub(crate) fn invoke_at(
    chain: &[Arc<dyn Stage>],
    position: usize,
    ctx: &mut InvocationContext,
    command: &Command,
) -> Result<Reply, Error> {
    ctx.check_canceled()?;
    match chain.get(position) {
        Some(stage) => stage.handle(
            ctx,
            command,
            Next {
                chain,
                position: position + 1,
                command,
            },
        ),
        None => Err(Error::NoHandler {
            command: command.kind(),
        }),
    }
}

/// A stage that handles nothing.
///
/// Useful as a placeholder or marker in a chain, and as the base case when
/// testing dispatch.
#[derive(Debug, Clone)]
pub struct ForwardingStage {
    kind: &'static str,
}

impl ForwardingStage {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl Stage for ForwardingStage {
    fn kind(&self) -> &'static str {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_proto::{CommandKind, PagingParams};

    struct Terminal;

    impl Stage for Terminal {
        fn kind(&self) -> &'static str {
            "terminal"
        }

        fn commit(&self, _ctx: &mut InvocationContext, _next: Next<'_>) -> Result<Reply, Error> {
            Ok(Reply::Done)
        }
    }

    /// Rewrites every entry read to a fixed id.
    struct Rewrite;

    impl Stage for Rewrite {
        fn kind(&self) -> &'static str {
            "rewrite"
        }

        fn read_content_entry(
            &self,
            ctx: &mut InvocationContext,
            _command: &ReadContentEntry,
            next: Next<'_>,
        ) -> Result<Reply, Error> {
            next.invoke(ctx, &Command::read_entry("rewritten"))
        }
    }

    struct EchoEntry;

    impl Stage for EchoEntry {
        fn kind(&self) -> &'static str {
            "echo"
        }

        fn read_content_entry(
            &self,
            _ctx: &mut InvocationContext,
            command: &ReadContentEntry,
            _next: Next<'_>,
        ) -> Result<Reply, Error> {
            Ok(Reply::Entry(folio_proto::ContentEntry::document(
                command.node_id.clone(),
                "echo",
            )))
        }
    }

    #[test]
    fn test_default_methods_forward() {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(ForwardingStage::new("a")),
            Arc::new(ForwardingStage::new("b")),
            Arc::new(Terminal),
        ];
        let mut ctx = InvocationContext::anonymous();
        let reply = invoke_at(&stages, 0, &mut ctx, &Command::Commit).unwrap();
        assert!(reply.is_done());
    }

    #[test]
    fn test_exhausted_chain_is_no_handler() {
        let stages: Vec<Arc<dyn Stage>> =
            vec![Arc::new(ForwardingStage::new("a")), Arc::new(Terminal)];
        let mut ctx = InvocationContext::anonymous();
        let err = invoke_at(
            &stages,
            0,
            &mut ctx,
            &Command::read_unfiled(PagingParams::default()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::NoHandler {
                command: CommandKind::ReadUnfiledEntries
            }
        ));
    }

    #[test]
    fn test_invoke_sends_new_command_downstream() {
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Rewrite), Arc::new(EchoEntry)];
        let mut ctx = InvocationContext::anonymous();
        let reply = invoke_at(&stages, 0, &mut ctx, &Command::read_entry("original")).unwrap();
        assert_eq!(reply.into_entry().unwrap().id, "rewritten");
    }

    #[test]
    fn test_canceled_before_dispatch() {
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Terminal)];
        let mut ctx = InvocationContext::anonymous();
        ctx.cancel_token().cancel();
        let err = invoke_at(&stages, 0, &mut ctx, &Command::Commit).unwrap_err();
        assert!(err.is_canceled());
    }
}
