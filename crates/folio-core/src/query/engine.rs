//! Query execution engine.
//!
//! A query run moves through four phases in order:
//!
//! ```text
//! Parsing -> Planning -> Optimizing -> Executing
//! ```
//!
//! Parsing only happens for statement text. Planning, optimization and
//! execution are timed; each duration is recorded even when the phase
//! fails, and the statistics gathered so far are published to the
//! [`InvocationContext`] at every phase boundary. After planning and after
//! optimizing the engine checks the context for problems and stops the run
//! if there are any.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use folio_proto::{QueryModel, ResultSet, StatementType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::optimizer::QueryOptimizer;
use super::parser::StatementParser;
use super::planner::QueryPlanner;
use super::processor::QueryProcessor;
use super::statistics::Statistics;
use crate::config::EngineConfig;
use crate::context::InvocationContext;
use crate::error::Error;

/// Phases of a query run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryPhase {
    Parsing,
    Planning,
    Optimizing,
    Executing,
}

impl QueryPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryPhase::Parsing => "parsing",
            QueryPhase::Planning => "planning",
            QueryPhase::Optimizing => "optimizing",
            QueryPhase::Executing => "executing",
        }
    }
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a query run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Every phase ran.
    Completed(ResultSet),
    /// A checkpoint found problems after the given phase.
    Halted { after: QueryPhase },
}

/// Outcome of a query run with the phase timings gathered.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRun {
    pub outcome: QueryOutcome,
    pub statistics: Statistics,
}

impl QueryRun {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, QueryOutcome::Completed(_))
    }

    /// The result set of a completed run.
    pub fn into_result_set(self) -> Option<ResultSet> {
        match self.outcome {
            QueryOutcome::Completed(rows) => Some(rows),
            QueryOutcome::Halted { .. } => None,
        }
    }
}

/// Drives a query through its phases using pluggable collaborators.
pub struct QueryEngine {
    parser: Arc<dyn StatementParser>,
    planner: Arc<dyn QueryPlanner>,
    optimizer: Arc<dyn QueryOptimizer>,
    processor: Arc<dyn QueryProcessor>,
    config: EngineConfig,
}

impl QueryEngine {
    /// Create an engine with the default configuration.
    pub fn new(
        parser: Arc<dyn StatementParser>,
        planner: Arc<dyn QueryPlanner>,
        optimizer: Arc<dyn QueryOptimizer>,
        processor: Arc<dyn QueryProcessor>,
    ) -> Self {
        Self {
            parser,
            planner,
            optimizer,
            processor,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse statement text into a query model.
    ///
    /// Any parser failure becomes [`Error::InvalidQuery`] with the parser's
    /// error as its source.
    pub fn parse(
        &self,
        ctx: &mut InvocationContext,
        statement: &str,
        statement_type: &StatementType,
    ) -> Result<QueryModel, Error> {
        ctx.check_canceled()?;
        let started = Instant::now();
        let parsed = self.parser.parse(statement, statement_type);
        debug!(
            statement_type = %statement_type,
            ok = parsed.is_ok(),
            duration_us = started.elapsed().as_micros() as u64,
            "Parsed statement"
        );
        parsed.map_err(|source| Error::InvalidQuery {
            statement: statement.to_string(),
            source,
        })
    }

    /// Plan, optimize and execute a query model.
    pub fn process(
        &self,
        ctx: &mut InvocationContext,
        model: &QueryModel,
    ) -> Result<QueryRun, Error> {
        let started = Instant::now();
        let mut statistics = Statistics::new();
        ctx.set_statistics(statistics);

        ctx.check_canceled()?;
        let phase = Instant::now();
        let planned = self.planner.create_plan(ctx, model);
        statistics = statistics.with_planning(phase.elapsed());
        ctx.set_statistics(statistics);
        let plan = planned?;
        if ctx.has_problems() {
            return Ok(self.halt(ctx, QueryPhase::Planning, statistics));
        }

        ctx.check_canceled()?;
        let phase = Instant::now();
        let optimized = self.optimizer.optimize(ctx, plan);
        statistics = statistics.with_optimization(phase.elapsed());
        ctx.set_statistics(statistics);
        let plan = optimized?;
        if ctx.has_problems() {
            return Ok(self.halt(ctx, QueryPhase::Optimizing, statistics));
        }
        debug!(source = %model.source, plan = %plan, "Optimized plan");

        ctx.check_canceled()?;
        let phase = Instant::now();
        let executed = self.processor.execute(ctx, model, statistics, &plan);
        let elapsed = phase.elapsed();
        let result = match executed {
            Ok(result) => result,
            Err(e) => {
                ctx.set_statistics(statistics.with_execution(elapsed));
                return Err(e);
            }
        };
        statistics = result.statistics.with_execution(elapsed);
        ctx.set_statistics(statistics);

        let total = started.elapsed();
        if self
            .config
            .slow_query_threshold
            .is_some_and(|threshold| total > threshold)
        {
            warn!(
                source = %model.source,
                rows = result.rows.len(),
                total_ms = total.as_millis() as u64,
                %statistics,
                "Slow query"
            );
        } else {
            debug!(
                source = %model.source,
                rows = result.rows.len(),
                %statistics,
                "Query completed"
            );
        }

        Ok(QueryRun {
            outcome: QueryOutcome::Completed(result.rows),
            statistics,
        })
    }

    /// Parse a statement and process the resulting model.
    pub fn submit(
        &self,
        ctx: &mut InvocationContext,
        statement: &str,
        statement_type: &StatementType,
    ) -> Result<QueryRun, Error> {
        let model = self.parse(ctx, statement, statement_type)?;
        self.process(ctx, &model)
    }

    fn halt(&self, ctx: &InvocationContext, after: QueryPhase, statistics: Statistics) -> QueryRun {
        debug!(
            phase = %after,
            problems = ctx.problems().len(),
            %statistics,
            "Query halted"
        );
        QueryRun {
            outcome: QueryOutcome::Halted { after },
            statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeCatalog;
    use crate::error::BoxError;
    use crate::query::{
        CatalogPlanner, CmisSqlParser, ExecutionPlan, ExecutionResult, RuleOptimizer,
        StoreProcessor,
    };
    use crate::storage::{ContentStore, SledContentStore, StorageConfig};
    use folio_proto::{ContentEntry, IndexChange, Predicate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn default_engine() -> QueryEngine {
        let catalog = Arc::new(TypeCatalog::cmis());
        let store = SledContentStore::open(StorageConfig::temporary()).unwrap();
        store
            .apply(&[
                IndexChange::Add(ContentEntry::folder("root", "Root")),
                IndexChange::Add(ContentEntry::document("d1", "a.txt").in_folder("root")),
                IndexChange::Add(ContentEntry::document("d2", "b.pdf").in_folder("root")),
            ])
            .unwrap();
        QueryEngine::new(
            Arc::new(CmisSqlParser::new(Arc::clone(&catalog))),
            Arc::new(CatalogPlanner::new(catalog)),
            Arc::new(RuleOptimizer::new()),
            Arc::new(StoreProcessor::new(Arc::new(store))),
        )
    }

    /// Counts calls and optionally reports a problem.
    struct Probe {
        calls: AtomicUsize,
        problem: Option<&'static str>,
    }

    impl Probe {
        fn new(problem: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                problem,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StatementParser for Probe {
        fn parse(&self, _: &str, _: &StatementType) -> Result<QueryModel, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QueryModel::select_all("cmis:document"))
        }
    }

    impl QueryPlanner for Probe {
        fn create_plan(
            &self,
            ctx: &mut InvocationContext,
            _: &QueryModel,
        ) -> Result<ExecutionPlan, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(problem) = self.problem {
                ctx.add_problem(QueryPhase::Planning, problem);
            }
            Ok(ExecutionPlan::new(crate::query::PlanNode::Access {
                selector: folio_proto::Selector::types(["cmis:document"]),
            }))
        }
    }

    impl QueryOptimizer for Probe {
        fn optimize(
            &self,
            ctx: &mut InvocationContext,
            plan: ExecutionPlan,
        ) -> Result<ExecutionPlan, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(problem) = self.problem {
                ctx.add_problem(QueryPhase::Optimizing, problem);
            }
            Ok(plan)
        }
    }

    impl QueryProcessor for Probe {
        fn execute(
            &self,
            _: &mut InvocationContext,
            _: &QueryModel,
            statistics: Statistics,
            _: &ExecutionPlan,
        ) -> Result<ExecutionResult, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionResult {
                rows: ResultSet::default(),
                statistics,
            })
        }
    }

    #[test]
    fn test_submit_default_collaborators() {
        let engine = default_engine();
        let mut ctx = InvocationContext::anonymous();
        let run = engine
            .submit(
                &mut ctx,
                "SELECT cmis:name FROM cmis:document ORDER BY cmis:name",
                &StatementType::CmisSql,
            )
            .unwrap();

        assert!(run.is_completed());
        assert!(run.statistics.planning().is_some());
        assert!(run.statistics.optimization().is_some());
        assert!(run.statistics.execution().is_some());
        assert_eq!(ctx.statistics(), Some(run.statistics));

        let rows = run.into_result_set().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_submit_equals_parse_then_process() {
        let engine = default_engine();
        let statement = "SELECT cmis:objectId FROM cmis:document WHERE cmis:name LIKE '%.pdf'";

        let mut ctx = InvocationContext::anonymous();
        let submitted = engine
            .submit(&mut ctx, statement, &StatementType::CmisSql)
            .unwrap();

        let mut ctx = InvocationContext::anonymous();
        let model = engine
            .parse(&mut ctx, statement, &StatementType::CmisSql)
            .unwrap();
        let processed = engine.process(&mut ctx, &model).unwrap();

        assert_eq!(submitted.outcome, processed.outcome);
    }

    #[test]
    fn test_parse_failure_is_invalid_query() {
        let engine = default_engine();
        let mut ctx = InvocationContext::anonymous();
        let err = engine
            .submit(&mut ctx, "SELECT * FROM X", &StatementType::CmisSql)
            .unwrap_err();

        match err {
            Error::InvalidQuery { statement, source } => {
                assert_eq!(statement, "SELECT * FROM X");
                assert!(source.to_string().contains("X"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ctx.statistics().is_none());
    }

    #[test]
    fn test_planning_problem_halts_before_optimizing() {
        let planner = Probe::new(Some("bad property"));
        let optimizer = Probe::new(None);
        let processor = Probe::new(None);
        let engine = QueryEngine::new(
            Probe::new(None),
            planner.clone(),
            optimizer.clone(),
            processor.clone(),
        );

        let mut ctx = InvocationContext::anonymous();
        let run = engine
            .process(&mut ctx, &QueryModel::select_all("cmis:document"))
            .unwrap();

        assert_eq!(
            run.outcome,
            QueryOutcome::Halted {
                after: QueryPhase::Planning
            }
        );
        assert!(run.statistics.planning().is_some());
        assert_eq!(run.statistics.optimization(), None);
        assert_eq!(run.statistics.execution(), None);
        assert_eq!(planner.calls(), 1);
        assert_eq!(optimizer.calls(), 0);
        assert_eq!(processor.calls(), 0);
    }

    #[test]
    fn test_optimization_problem_halts_before_executing() {
        let processor = Probe::new(None);
        let engine = QueryEngine::new(
            Probe::new(None),
            Probe::new(None),
            Probe::new(Some("no index")),
            processor.clone(),
        );

        let mut ctx = InvocationContext::anonymous();
        let run = engine
            .process(&mut ctx, &QueryModel::select_all("cmis:document"))
            .unwrap();

        assert_eq!(
            run.outcome,
            QueryOutcome::Halted {
                after: QueryPhase::Optimizing
            }
        );
        assert!(run.statistics.optimization().is_some());
        assert_eq!(run.statistics.execution(), None);
        assert_eq!(processor.calls(), 0);
    }

    #[test]
    fn test_failed_phase_still_timed() {
        struct FailingProcessor;

        impl QueryProcessor for FailingProcessor {
            fn execute(
                &self,
                _: &mut InvocationContext,
                _: &QueryModel,
                _: Statistics,
                _: &ExecutionPlan,
            ) -> Result<ExecutionResult, Error> {
                std::thread::sleep(Duration::from_millis(2));
                Err(Error::InvalidData("boom".into()))
            }
        }

        let engine = QueryEngine::new(
            Probe::new(None),
            Probe::new(None),
            Probe::new(None),
            Arc::new(FailingProcessor),
        );

        let mut ctx = InvocationContext::anonymous();
        let err = engine
            .process(&mut ctx, &QueryModel::select_all("cmis:document"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        let stats = ctx.statistics().unwrap();
        assert!(stats.execution().unwrap() >= Duration::from_millis(2));
        assert!(stats.planning().is_some());
    }

    #[test]
    fn test_canceled_before_planning() {
        let planner = Probe::new(None);
        let engine = QueryEngine::new(
            Probe::new(None),
            planner.clone(),
            Probe::new(None),
            Probe::new(None),
        );

        let mut ctx = InvocationContext::anonymous();
        ctx.cancel_token().cancel();
        let err = engine
            .process(&mut ctx, &QueryModel::select_all("cmis:document"))
            .unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(planner.calls(), 0);
    }

    #[test]
    fn test_default_planner_problem_halts() {
        let engine = default_engine();
        let mut ctx = InvocationContext::anonymous();
        let model = QueryModel::select_all("cmis:document")
            .with_predicate(Predicate::eq("acme:unknown", 1i64));

        let run = engine.process(&mut ctx, &model).unwrap();
        assert!(!run.is_completed());
        assert_eq!(ctx.problems().len(), 1);
    }
}
