//! The terminal stage, backed by a [`ContentStore`].

use std::sync::Arc;

use folio_proto::{ExecuteSelector, ModifyIndex, ReadChildEntries, ReadContentEntry, ReadUnfiledEntries};
use tracing::debug;

use crate::config::RepositoryConfig;
use crate::context::InvocationContext;
use crate::error::Error;
use crate::pipeline::{Next, Reply, Stage};
use crate::storage::ContentStore;

/// Reads, index batches, selectors and commit acknowledgements against a
/// content store.
///
/// Listings are paged with `default_page_size` when the caller asked for no
/// page size, and never return more than `max_page_size` items.
pub struct StoreStage {
    store: Arc<dyn ContentStore>,
    default_page_size: usize,
    max_page_size: usize,
    flush_on_commit: bool,
}

impl StoreStage {
    pub const KIND: &'static str = "store";

    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        let defaults = RepositoryConfig::default();
        Self {
            store,
            default_page_size: defaults.default_page_size,
            max_page_size: defaults.max_page_size,
            flush_on_commit: defaults.flush_on_commit,
        }
    }

    /// Take paging and commit settings from a repository configuration.
    pub fn with_config(mut self, config: &RepositoryConfig) -> Self {
        self.default_page_size = config.default_page_size;
        self.max_page_size = config.max_page_size;
        self.flush_on_commit = config.flush_on_commit;
        self
    }
}

impl Stage for StoreStage {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn read_child_entries(
        &self,
        ctx: &mut InvocationContext,
        command: &ReadChildEntries,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        let children = self.store.children(&command.parent_id)?;
        ctx.check_canceled()?;
        Ok(Reply::Entries(command.paging.apply(
            children,
            self.default_page_size,
            self.max_page_size,
        )))
    }

    fn read_content_entry(
        &self,
        _ctx: &mut InvocationContext,
        command: &ReadContentEntry,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        self.store
            .get_entry(&command.node_id)?
            .map(Reply::Entry)
            .ok_or_else(|| Error::NotFound(command.node_id.clone()))
    }

    fn read_unfiled_entries(
        &self,
        ctx: &mut InvocationContext,
        command: &ReadUnfiledEntries,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        let unfiled = self.store.unfiled()?;
        ctx.check_canceled()?;
        Ok(Reply::Entries(command.paging.apply(
            unfiled,
            self.default_page_size,
            self.max_page_size,
        )))
    }

    fn modify_index(
        &self,
        _ctx: &mut InvocationContext,
        command: &ModifyIndex,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        Ok(Reply::Indexed(self.store.apply(&command.changes)?))
    }

    fn execute_selector(
        &self,
        _ctx: &mut InvocationContext,
        command: &ExecuteSelector,
        _next: Next<'_>,
    ) -> Result<Reply, Error> {
        Ok(Reply::Selected(self.store.select(&command.selector)?))
    }

    fn commit(&self, _ctx: &mut InvocationContext, _next: Next<'_>) -> Result<Reply, Error> {
        if self.flush_on_commit {
            self.store.flush()?;
            debug!("Flushed store on commit");
        }
        Ok(Reply::Done)
    }

    fn roll_back(&self, _ctx: &mut InvocationContext, _next: Next<'_>) -> Result<Reply, Error> {
        Ok(Reply::Done)
    }
}
