//! Plan execution.

use std::cmp::Ordering;
use std::sync::Arc;

use folio_proto::{ContentEntry, OrderSpec, QueryModel, ResultSet, Row, SortDirection, Value};

use super::filter::FilterEvaluator;
use super::plan::{ExecutionPlan, PlanNode};
use super::statistics::Statistics;
use crate::context::InvocationContext;
use crate::error::Error;
use crate::storage::ContentStore;

/// Rows produced by a processor together with the statistics it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub rows: ResultSet,
    pub statistics: Statistics,
}

/// Executes an optimized plan.
pub trait QueryProcessor: Send + Sync {
    /// Execute `plan` for `model`.
    ///
    /// `statistics` holds the timings of the phases that already ran.
    fn execute(
        &self,
        ctx: &mut InvocationContext,
        model: &QueryModel,
        statistics: Statistics,
        plan: &ExecutionPlan,
    ) -> Result<ExecutionResult, Error>;
}

/// Processor that evaluates plans against a [`ContentStore`].
pub struct StoreProcessor {
    store: Arc<dyn ContentStore>,
}

/// Intermediate entries plus whether a limit dropped any.
struct Entries {
    items: Vec<ContentEntry>,
    truncated: bool,
}

impl StoreProcessor {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    fn evaluate(&self, ctx: &InvocationContext, node: &PlanNode) -> Result<Entries, Error> {
        match node {
            PlanNode::Access { selector } => Ok(Entries {
                items: self.store.select(selector)?,
                truncated: false,
            }),
            PlanNode::Filter { predicate, input } => {
                let input = self.evaluate(ctx, input)?;
                let mut items = Vec::with_capacity(input.items.len());
                for entry in input.items {
                    ctx.check_canceled()?;
                    if FilterEvaluator::matches(predicate, &entry) {
                        items.push(entry);
                    }
                }
                Ok(Entries {
                    items,
                    truncated: input.truncated,
                })
            }
            PlanNode::Sort { keys, input } => {
                let mut input = self.evaluate(ctx, input)?;
                ctx.check_canceled()?;
                input.items.sort_by(|a, b| compare_entries(a, b, keys));
                Ok(input)
            }
            PlanNode::Limit {
                offset,
                limit,
                input,
            } => {
                let input = self.evaluate(ctx, input)?;
                let total = input.items.len();
                let items: Vec<ContentEntry> = input
                    .items
                    .into_iter()
                    .skip(*offset)
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                let truncated = input.truncated || offset.saturating_add(items.len()) < total;
                Ok(Entries { items, truncated })
            }
            PlanNode::Project { input, .. } => self.evaluate(ctx, input),
        }
    }
}

impl QueryProcessor for StoreProcessor {
    fn execute(
        &self,
        ctx: &mut InvocationContext,
        _model: &QueryModel,
        statistics: Statistics,
        plan: &ExecutionPlan,
    ) -> Result<ExecutionResult, Error> {
        let columns = plan
            .columns()
            .ok_or_else(|| Error::InvalidData("plan has no projection".to_string()))?
            .to_vec();

        let entries = self.evaluate(ctx, &plan.root)?;

        let mut rows = Vec::with_capacity(entries.items.len());
        for entry in &entries.items {
            ctx.check_canceled()?;
            rows.push(Row::new(
                columns
                    .iter()
                    .map(|c| entry.property(c).unwrap_or(Value::Null))
                    .collect(),
            ));
        }

        Ok(ExecutionResult {
            rows: ResultSet::new(columns, rows, entries.truncated),
            statistics,
        })
    }
}

/// Order two entries by the sort keys. Unset values sort last in either
/// direction; mixed value types order as [`Value::sort_cmp`] does. Ties are
/// broken by id.
fn compare_entries(a: &ContentEntry, b: &ContentEntry, keys: &[OrderSpec]) -> Ordering {
    for key in keys {
        let left = a.property(&key.property).filter(|v| !v.is_null());
        let right = b.property(&key.property).filter(|v| !v.is_null());
        let ord = match (&left, &right) {
            (Some(l), Some(r)) => {
                let ord = l.sort_cmp(r);
                match key.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}
