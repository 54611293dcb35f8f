//! Plan rewriting.

use super::engine::QueryPhase;
use super::plan::{ExecutionPlan, PlanNode};
use crate::context::InvocationContext;
use crate::error::Error;

/// Rewrites a plan into an equivalent, cheaper one.
pub trait QueryOptimizer: Send + Sync {
    fn optimize(
        &self,
        ctx: &mut InvocationContext,
        plan: ExecutionPlan,
    ) -> Result<ExecutionPlan, Error>;
}

/// Rule-based optimizer.
///
/// Rules applied bottom-up:
/// - a filter directly above an access is pushed into the access selector
/// - sorts without keys are removed
/// - limits with no offset and no limit are removed
///
/// A plan whose access selects no types is reported as a problem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleOptimizer;

impl RuleOptimizer {
    pub fn new() -> Self {
        Self
    }

    fn rewrite(node: PlanNode) -> PlanNode {
        match node {
            PlanNode::Access { .. } => node,
            PlanNode::Filter { predicate, input } => match Self::rewrite(*input) {
                PlanNode::Access { selector } => PlanNode::Access {
                    selector: selector.filtered(predicate),
                },
                input => PlanNode::Filter {
                    predicate,
                    input: Box::new(input),
                },
            },
            PlanNode::Sort { keys, input } if keys.is_empty() => Self::rewrite(*input),
            PlanNode::Sort { keys, input } => PlanNode::Sort {
                keys,
                input: Box::new(Self::rewrite(*input)),
            },
            PlanNode::Limit {
                offset: 0,
                limit: None,
                input,
            } => Self::rewrite(*input),
            PlanNode::Limit {
                offset,
                limit,
                input,
            } => PlanNode::Limit {
                offset,
                limit,
                input: Box::new(Self::rewrite(*input)),
            },
            PlanNode::Project { columns, input } => PlanNode::Project {
                columns,
                input: Box::new(Self::rewrite(*input)),
            },
        }
    }
}

impl QueryOptimizer for RuleOptimizer {
    fn optimize(
        &self,
        ctx: &mut InvocationContext,
        plan: ExecutionPlan,
    ) -> Result<ExecutionPlan, Error> {
        let optimized = ExecutionPlan::new(Self::rewrite(plan.root));
        let scans_nothing = optimized
            .access()
            .map_or(true, |selector| selector.type_ids.is_empty());
        if scans_nothing {
            ctx.add_problem(QueryPhase::Optimizing, "plan has no access path");
        }
        Ok(optimized)
    }
}
