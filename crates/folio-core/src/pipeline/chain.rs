//! The mutable stage chain.

use std::fmt;
use std::sync::Arc;

use folio_proto::Command;
use parking_lot::{Mutex, RwLock};

use super::reply::Reply;
use super::stage::{invoke_at, Stage};
use crate::context::InvocationContext;
use crate::error::Error;

type Chain = Arc<[Arc<dyn Stage>]>;

/// An ordered chain of stages with a single entry point.
///
/// Edits are serialized by an edit lock and publish a new chain snapshot;
/// calls already running keep the snapshot they started with.
pub struct Pipeline {
    stages: RwLock<Chain>,
    edit: Mutex<()>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::with_stages(Vec::new())
    }

    /// Create a pipeline from an ordered list of stages.
    pub fn with_stages(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages: RwLock::new(stages.into()),
            edit: Mutex::new(()),
        }
    }

    /// Send a command into the chain's entry stage.
    ///
    /// Returns [`Error::Canceled`] when the context was canceled before the
    /// call or while it ran, even if a stage produced a result.
    pub fn invoke(&self, ctx: &mut InvocationContext, command: &Command) -> Result<Reply, Error> {
        let chain = self.snapshot();
        let result = invoke_at(&chain, 0, ctx, command);
        if ctx.is_canceled() {
            return Err(Error::Canceled);
        }
        result
    }

    /// Insert a stage at a zero-based position; `0..=len` is valid.
    pub fn insert(&self, stage: Arc<dyn Stage>, position: usize) -> Result<(), Error> {
        self.edit(|stages| {
            if position > stages.len() {
                return Err(Error::OutOfRange {
                    position,
                    len: stages.len(),
                });
            }
            stages.insert(position, stage);
            Ok(())
        })
    }

    /// Remove and return the stage at a position; `0..len` is valid.
    pub fn remove_at(&self, position: usize) -> Result<Arc<dyn Stage>, Error> {
        self.edit(|stages| {
            if position >= stages.len() {
                return Err(Error::OutOfRange {
                    position,
                    len: stages.len(),
                });
            }
            Ok(stages.remove(position))
        })
    }

    /// Replace the stage at a position, returning the previous one.
    pub fn replace(&self, position: usize, stage: Arc<dyn Stage>) -> Result<Arc<dyn Stage>, Error> {
        self.edit(|stages| match stages.get_mut(position) {
            Some(slot) => Ok(std::mem::replace(slot, stage)),
            None => Err(Error::OutOfRange {
                position,
                len: stages.len(),
            }),
        })
    }

    /// Remove every stage of a kind. Returns how many were removed.
    pub fn remove_all_of_kind(&self, kind: &str) -> usize {
        let _guard = self.edit.lock();
        let mut stages = self.stages.read().to_vec();
        let before = stages.len();
        stages.retain(|s| s.kind() != kind);
        let removed = before - stages.len();
        if removed > 0 {
            *self.stages.write() = stages.into();
        }
        removed
    }

    /// Insert a stage right after the first stage of `kind`.
    ///
    /// Returns `false` and leaves the chain unchanged when no stage of that
    /// kind exists.
    pub fn insert_after(&self, stage: Arc<dyn Stage>, kind: &str) -> bool {
        self.insert_relative(stage, kind, 1)
    }

    /// Insert a stage right before the first stage of `kind`.
    ///
    /// Returns `false` and leaves the chain unchanged when no stage of that
    /// kind exists.
    pub fn insert_before(&self, stage: Arc<dyn Stage>, kind: &str) -> bool {
        self.insert_relative(stage, kind, 0)
    }

    /// Add a stage at the tail of the chain.
    pub fn append(&self, stage: Arc<dyn Stage>) {
        let _guard = self.edit.lock();
        let mut stages = self.stages.read().to_vec();
        stages.push(stage);
        *self.stages.write() = stages.into();
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }

    /// A snapshot of the stages in chain order.
    pub fn to_list(&self) -> Vec<Arc<dyn Stage>> {
        self.stages.read().to_vec()
    }

    /// A snapshot of the stage kinds in chain order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.stages.read().iter().map(|s| s.kind()).collect()
    }

    /// The entry stage, if any.
    pub fn entry(&self) -> Option<Arc<dyn Stage>> {
        self.stages.read().first().cloned()
    }

    /// Whether this exact stage instance is in the chain.
    pub fn contains_instance(&self, stage: &Arc<dyn Stage>) -> bool {
        self.stages
            .read()
            .iter()
            .any(|s| std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(stage)))
    }

    /// The first stage of a kind.
    pub fn find_by_kind(&self, kind: &str) -> Option<Arc<dyn Stage>> {
        self.stages.read().iter().find(|s| s.kind() == kind).cloned()
    }

    fn snapshot(&self) -> Chain {
        self.stages.read().clone()
    }

    fn insert_relative(&self, stage: Arc<dyn Stage>, kind: &str, offset: usize) -> bool {
        let _guard = self.edit.lock();
        let mut stages = self.stages.read().to_vec();
        match stages.iter().position(|s| s.kind() == kind) {
            Some(anchor) => {
                stages.insert(anchor + offset, stage);
                *self.stages.write() = stages.into();
                true
            }
            None => false,
        }
    }

    /// Apply an edit to a copy of the chain and publish it on success.
    fn edit<T>(
        &self,
        f: impl FnOnce(&mut Vec<Arc<dyn Stage>>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let _guard = self.edit.lock();
        let mut stages = self.stages.read().to_vec();
        let out = f(&mut stages)?;
        *self.stages.write() = stages.into();
        Ok(out)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ForwardingStage, Next};

    fn stage(kind: &'static str) -> Arc<dyn Stage> {
        Arc::new(ForwardingStage::new(kind))
    }

    struct Done;

    impl Stage for Done {
        fn kind(&self) -> &'static str {
            "done"
        }

        fn commit(&self, _ctx: &mut InvocationContext, _next: Next<'_>) -> Result<Reply, Error> {
            Ok(Reply::Done)
        }
    }

    #[test]
    fn test_insert_positions() {
        let pipeline = Pipeline::new();
        pipeline.insert(stage("b"), 0).unwrap();
        pipeline.insert(stage("a"), 0).unwrap();
        pipeline.insert(stage("c"), 2).unwrap();
        assert_eq!(pipeline.kinds(), vec!["a", "b", "c"]);
        assert_eq!(pipeline.entry().map(|s| s.kind()), Some("a"));

        let err = pipeline.insert(stage("x"), 4).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { position: 4, len: 3 }));
        assert_eq!(pipeline.len(), 3);
    }

    #[test]
    fn test_remove_at() {
        let pipeline = Pipeline::with_stages(vec![stage("a"), stage("b"), stage("c")]);
        let removed = pipeline.remove_at(0).unwrap();
        assert_eq!(removed.kind(), "a");
        assert_eq!(pipeline.entry().map(|s| s.kind()), Some("b"));

        assert!(matches!(
            pipeline.remove_at(2),
            Err(Error::OutOfRange { position: 2, len: 2 })
        ));

        pipeline.remove_at(1).unwrap();
        pipeline.remove_at(0).unwrap();
        assert!(pipeline.is_empty());
        assert!(pipeline.entry().is_none());
    }

    #[test]
    fn test_remove_all_of_kind_preserves_order() {
        let pipeline =
            Pipeline::with_stages(vec![stage("x"), stage("a"), stage("x"), stage("b"), stage("x")]);
        assert_eq!(pipeline.remove_all_of_kind("x"), 3);
        assert_eq!(pipeline.kinds(), vec!["a", "b"]);
        assert_eq!(pipeline.remove_all_of_kind("x"), 0);
    }

    #[test]
    fn test_insert_relative_uses_first_anchor() {
        let pipeline = Pipeline::with_stages(vec![stage("a"), stage("b"), stage("a")]);
        assert!(pipeline.insert_after(stage("after"), "a"));
        assert!(pipeline.insert_before(stage("before"), "b"));
        assert_eq!(pipeline.kinds(), vec!["a", "after", "before", "b", "a"]);
    }

    #[test]
    fn test_replace() {
        let pipeline = Pipeline::with_stages(vec![stage("a"), stage("b")]);
        let old = pipeline.replace(1, stage("c")).unwrap();
        assert_eq!(old.kind(), "b");
        assert_eq!(pipeline.kinds(), vec!["a", "c"]);
        assert!(pipeline.replace(2, stage("d")).is_err());
    }

    #[test]
    fn test_contains_instance_is_identity() {
        let a = stage("a");
        let twin = stage("a");
        let pipeline = Pipeline::with_stages(vec![Arc::clone(&a)]);

        assert!(pipeline.contains_instance(&a));
        assert!(!pipeline.contains_instance(&twin));
        assert!(pipeline.find_by_kind("a").is_some());
        assert!(pipeline.find_by_kind("z").is_none());
    }

    #[test]
    fn test_to_list_is_snapshot() {
        let pipeline = Pipeline::with_stages(vec![stage("a")]);
        let list = pipeline.to_list();
        pipeline.append(stage("b"));
        assert_eq!(list.len(), 1);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_invoke_enters_at_head() {
        let pipeline = Pipeline::with_stages(vec![stage("a"), Arc::new(Done)]);
        let mut ctx = InvocationContext::anonymous();
        assert!(pipeline.invoke(&mut ctx, &Command::Commit).unwrap().is_done());

        let empty = Pipeline::new();
        assert!(matches!(
            empty.invoke(&mut ctx, &Command::Commit),
            Err(Error::NoHandler { .. })
        ));
    }

    #[test]
    fn test_debug_lists_kinds() {
        let pipeline = Pipeline::with_stages(vec![stage("a"), stage("b")]);
        assert_eq!(format!("{:?}", pipeline), r#"Pipeline { stages: ["a", "b"] }"#);
    }
}
