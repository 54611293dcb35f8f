//! Unit-of-work buffering.
//!
//! When a request carries a [`TransactionScope`](crate::context::TransactionScope),
//! index batches are buffered in the scope instead of reaching the store.
//! `Commit` sends everything buffered as a single `ModifyIndex` before
//! forwarding the commit itself. A failed commit leaves the buffer as it
//! was. `RollBack` drops the buffer. Requests without
//! a scope pass straight through.

use folio_proto::{Command, IndexSummary, ModifyIndex};
use tracing::debug;

use crate::context::InvocationContext;
use crate::error::Error;
use crate::pipeline::{Next, Reply, Stage};

#[derive(Debug, Clone, Default)]
pub struct UnitOfWorkStage;

impl UnitOfWorkStage {
    pub const KIND: &'static str = "unit-of-work";

    pub fn new() -> Self {
        Self
    }
}

impl Stage for UnitOfWorkStage {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn modify_index(
        &self,
        ctx: &mut InvocationContext,
        command: &ModifyIndex,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        let Some(scope) = ctx.transaction() else {
            return next.forward(ctx);
        };
        let pending = scope.stage(command.changes.iter().cloned());
        debug!(
            staged = command.changes.len(),
            pending, "Buffered index changes"
        );
        Ok(Reply::Indexed(IndexSummary::staged(command.changes.len())))
    }

    fn commit(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<Reply, Error> {
        let Some(scope) = ctx.transaction().cloned() else {
            return next.forward(ctx);
        };
        let changes = scope.take();
        if !changes.is_empty() {
            let count = changes.len();
            let command = Command::modify_index(changes);
            if let Err(err) = next.invoke(ctx, &command) {
                if let Command::ModifyIndex(batch) = command {
                    scope.restore(batch.changes);
                }
                debug!(changes = count, error = %err, "Commit failed, changes kept pending");
                return Err(err);
            }
            debug!(changes = count, "Committed buffered index changes");
        }
        next.forward(ctx)
    }

    fn roll_back(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<Reply, Error> {
        if let Some(scope) = ctx.transaction() {
            let dropped = scope.discard();
            debug!(dropped, "Discarded buffered index changes");
        }
        next.forward(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransactionScope;
    use crate::pipeline::Pipeline;
    use folio_proto::{ContentEntry, IndexChange};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every batch it receives.
    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<usize>>,
    }

    impl Stage for Recorder {
        fn kind(&self) -> &'static str {
            "recorder"
        }

        fn modify_index(
            &self,
            _ctx: &mut InvocationContext,
            command: &ModifyIndex,
            _next: Next<'_>,
        ) -> Result<Reply, Error> {
            self.batches.lock().push(command.changes.len());
            Ok(Reply::Indexed(IndexSummary::applied(&command.changes)))
        }

        fn commit(&self, _ctx: &mut InvocationContext, _next: Next<'_>) -> Result<Reply, Error> {
            Ok(Reply::Done)
        }

        fn roll_back(&self, _ctx: &mut InvocationContext, _next: Next<'_>) -> Result<Reply, Error> {
            Ok(Reply::Done)
        }
    }

    fn add(id: &str) -> Command {
        Command::modify_index(vec![IndexChange::Add(ContentEntry::document(id, id))])
    }

    fn setup() -> (Pipeline, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let pipeline = Pipeline::with_stages(vec![
            Arc::new(UnitOfWorkStage::new()),
            recorder.clone(),
        ]);
        (pipeline, recorder)
    }

    #[test]
    fn test_without_scope_passes_through() {
        let (pipeline, recorder) = setup();
        let mut ctx = InvocationContext::anonymous();

        let summary = pipeline.invoke(&mut ctx, &add("a")).unwrap().into_indexed().unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(*recorder.batches.lock(), vec![1]);
    }

    #[test]
    fn test_commit_sends_one_batch() {
        let (pipeline, recorder) = setup();
        let scope = TransactionScope::new();

        for id in ["a", "b"] {
            let mut ctx = InvocationContext::anonymous().with_transaction(scope.clone());
            let summary = pipeline.invoke(&mut ctx, &add(id)).unwrap().into_indexed().unwrap();
            assert_eq!(summary.staged, 1);
        }
        assert!(recorder.batches.lock().is_empty());
        assert_eq!(scope.pending(), 2);

        let mut ctx = InvocationContext::anonymous().with_transaction(scope.clone());
        assert!(pipeline.invoke(&mut ctx, &Command::Commit).unwrap().is_done());
        assert_eq!(*recorder.batches.lock(), vec![2]);
        assert_eq!(scope.pending(), 0);
    }

    #[test]
    fn test_empty_commit_sends_nothing() {
        let (pipeline, recorder) = setup();
        let mut ctx = InvocationContext::anonymous().with_transaction(TransactionScope::new());

        assert!(pipeline.invoke(&mut ctx, &Command::Commit).unwrap().is_done());
        assert!(recorder.batches.lock().is_empty());
    }

    #[test]
    fn test_roll_back_discards() {
        let (pipeline, recorder) = setup();
        let scope = TransactionScope::new();
        let mut ctx = InvocationContext::anonymous().with_transaction(scope.clone());

        pipeline.invoke(&mut ctx, &add("a")).unwrap();
        assert!(pipeline.invoke(&mut ctx, &Command::RollBack).unwrap().is_done());
        assert_eq!(scope.pending(), 0);

        pipeline.invoke(&mut ctx, &Command::Commit).unwrap();
        assert!(recorder.batches.lock().is_empty());
    }

    /// Rejects every batch.
    struct Rejecting;

    impl Stage for Rejecting {
        fn kind(&self) -> &'static str {
            "rejecting"
        }

        fn modify_index(
            &self,
            _ctx: &mut InvocationContext,
            _command: &ModifyIndex,
            _next: Next<'_>,
        ) -> Result<Reply, Error> {
            Err(Error::NotFound("missing".to_string()))
        }
    }

    #[test]
    fn test_failed_commit_keeps_changes_pending() {
        let pipeline = Pipeline::with_stages(vec![
            Arc::new(UnitOfWorkStage::new()),
            Arc::new(Rejecting),
        ]);
        let scope = TransactionScope::new();
        let mut ctx = InvocationContext::anonymous().with_transaction(scope.clone());
        pipeline.invoke(&mut ctx, &add("a")).unwrap();
        pipeline.invoke(&mut ctx, &add("b")).unwrap();

        let err = pipeline.invoke(&mut ctx, &Command::Commit).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(scope.pending(), 2);

        let ids: Vec<String> = scope
            .take()
            .into_iter()
            .map(|change| match change {
                IndexChange::Add(entry) => entry.id,
                other => panic!("unexpected change {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
