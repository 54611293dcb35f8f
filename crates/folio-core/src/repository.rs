//! Repository facade over the default pipeline.

use std::sync::Arc;

use folio_proto::{
    Command, ContentEntry, EntryPage, IndexChange, IndexSummary, PagingParams, QueryModel,
    Selector, StatementType,
};
use tracing::info;

use crate::catalog::TypeCatalog;
use crate::config::RepositoryConfig;
use crate::context::InvocationContext;
use crate::error::Error;
use crate::pipeline::{Pipeline, QueryResults, Reply, Stage};
use crate::query::{CatalogPlanner, CmisSqlParser, QueryEngine, RuleOptimizer, StoreProcessor};
use crate::stages::{QueryStage, StatementStage, StoreStage, TracingStage, UnitOfWorkStage};
use crate::storage::{ContentStore, SledContentStore};

/// A content repository: a type catalog, a content store and the pipeline
/// every operation goes through.
///
/// The pipeline is exposed through [`Repository::pipeline`] so callers can
/// add, remove or replace stages at runtime.
pub struct Repository {
    pipeline: Pipeline,
    catalog: Arc<TypeCatalog>,
    store: Arc<dyn ContentStore>,
}

impl Repository {
    /// Open a repository backed by a sled store with the CMIS base types.
    pub fn open(config: RepositoryConfig) -> Result<Self, Error> {
        let store = SledContentStore::open(config.storage.clone())?;
        info!(
            path = %config.storage.path.display(),
            recovered = store.was_recovered(),
            entries = store.len(),
            "Opened repository"
        );
        Ok(Self::with_store(
            Arc::new(store),
            Arc::new(TypeCatalog::cmis()),
            config,
        ))
    }

    /// Build a repository over an existing store and catalog.
    pub fn with_store(
        store: Arc<dyn ContentStore>,
        catalog: Arc<TypeCatalog>,
        config: RepositoryConfig,
    ) -> Self {
        let engine = QueryEngine::new(
            Arc::new(CmisSqlParser::new(Arc::clone(&catalog))),
            Arc::new(CatalogPlanner::new(Arc::clone(&catalog))),
            Arc::new(RuleOptimizer::new()),
            Arc::new(StoreProcessor::new(Arc::clone(&store))),
        )
        .with_config(config.engine.clone());

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(TracingStage::new()),
            Arc::new(UnitOfWorkStage::new()),
            Arc::new(StatementStage::new()),
            Arc::new(QueryStage::new(Arc::new(engine))),
            Arc::new(StoreStage::new(Arc::clone(&store)).with_config(&config)),
        ];

        Self {
            pipeline: Pipeline::with_stages(stages),
            catalog,
            store,
        }
    }

    /// The stage chain every operation goes through.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Send any command through the pipeline.
    pub fn invoke(&self, ctx: &mut InvocationContext, command: &Command) -> Result<Reply, Error> {
        self.pipeline.invoke(ctx, command)
    }

    /// List the children of a folder.
    pub fn get_children(
        &self,
        ctx: &mut InvocationContext,
        parent_id: &str,
        paging: PagingParams,
    ) -> Result<EntryPage, Error> {
        let reply = self.invoke(ctx, &Command::read_children(parent_id, paging))?;
        expect_reply(reply, "entries", Reply::into_entries)
    }

    /// Read one entry by id.
    pub fn get_entry(&self, ctx: &mut InvocationContext, id: &str) -> Result<ContentEntry, Error> {
        let reply = self.invoke(ctx, &Command::read_entry(id))?;
        expect_reply(reply, "entry", Reply::into_entry)
    }

    /// List entries that are not filed in any folder.
    pub fn get_unfiled(
        &self,
        ctx: &mut InvocationContext,
        paging: PagingParams,
    ) -> Result<EntryPage, Error> {
        let reply = self.invoke(ctx, &Command::read_unfiled(paging))?;
        expect_reply(reply, "entries", Reply::into_entries)
    }

    /// Apply or stage a batch of index changes.
    pub fn modify_index(
        &self,
        ctx: &mut InvocationContext,
        changes: Vec<IndexChange>,
    ) -> Result<IndexSummary, Error> {
        let reply = self.invoke(ctx, &Command::modify_index(changes))?;
        expect_reply(reply, "indexed", Reply::into_indexed)
    }

    /// Run a storage-level selector.
    pub fn select(
        &self,
        ctx: &mut InvocationContext,
        selector: Selector,
    ) -> Result<Vec<ContentEntry>, Error> {
        let reply = self.invoke(ctx, &Command::execute_selector(selector))?;
        expect_reply(reply, "selected", Reply::into_selected)
    }

    /// Plan, optimize and execute a parsed query.
    pub fn process_query(
        &self,
        ctx: &mut InvocationContext,
        model: QueryModel,
    ) -> Result<QueryResults, Error> {
        let reply = self.invoke(ctx, &Command::process_query(model))?;
        expect_reply(reply, "query", Reply::into_query)
    }

    /// Submit a CMIS SQL statement.
    pub fn query(&self, ctx: &mut InvocationContext, statement: &str) -> Result<QueryResults, Error> {
        self.submit(ctx, statement, StatementType::CmisSql)
    }

    /// Submit a statement of any type.
    pub fn submit(
        &self,
        ctx: &mut InvocationContext,
        statement: &str,
        statement_type: StatementType,
    ) -> Result<QueryResults, Error> {
        let reply = self.invoke(ctx, &Command::submit_statement(statement, statement_type))?;
        expect_reply(reply, "query", Reply::into_query)
    }

    /// Commit the context's unit of work.
    pub fn commit(&self, ctx: &mut InvocationContext) -> Result<(), Error> {
        self.invoke(ctx, &Command::Commit).map(|_| ())
    }

    /// Discard the context's unit of work.
    pub fn roll_back(&self, ctx: &mut InvocationContext) -> Result<(), Error> {
        self.invoke(ctx, &Command::RollBack).map(|_| ())
    }
}

fn expect_reply<T>(
    reply: Reply,
    expected: &str,
    extract: impl FnOnce(Reply) -> Option<T>,
) -> Result<T, Error> {
    let name = reply.name();
    extract(reply).ok_or_else(|| {
        Error::InvalidData(format!("expected {expected} reply, got {name}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ForwardingStage;

    #[test]
    fn test_default_chain() {
        let repo = Repository::open(RepositoryConfig::temporary()).unwrap();
        assert_eq!(
            repo.pipeline().kinds(),
            vec!["tracing", "unit-of-work", "statement", "query", "store"]
        );
    }

    #[test]
    fn test_unexpected_reply_is_invalid_data() {
        struct AlwaysDone;

        impl Stage for AlwaysDone {
            fn kind(&self) -> &'static str {
                "always-done"
            }

            fn handle(
                &self,
                _ctx: &mut InvocationContext,
                _command: &Command,
                _next: crate::pipeline::Next<'_>,
            ) -> Result<Reply, Error> {
                Ok(Reply::Done)
            }
        }

        let repo = Repository::open(RepositoryConfig::temporary()).unwrap();
        repo.pipeline().insert(Arc::new(AlwaysDone), 0).unwrap();
        let mut ctx = InvocationContext::anonymous();

        let err = repo.get_entry(&mut ctx, "x").unwrap_err();
        assert!(matches!(err, Error::InvalidData(msg) if msg.contains("got done")));
    }

    #[test]
    fn test_marker_stage_is_transparent() {
        let repo = Repository::open(RepositoryConfig::temporary()).unwrap();
        assert!(repo
            .pipeline()
            .insert_before(Arc::new(ForwardingStage::new("audit")), "store"));

        let mut ctx = InvocationContext::anonymous();
        let summary = repo
            .modify_index(
                &mut ctx,
                vec![IndexChange::Add(ContentEntry::folder("root", "Root"))],
            )
            .unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(repo.get_entry(&mut ctx, "root").unwrap().name, "Root");
    }
}
