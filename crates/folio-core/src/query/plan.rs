//! Execution plans.
//!
//! A plan is a tree of [`PlanNode`]s with a single storage access at its
//! leaf. The planner produces the canonical shape
//! `Project(Limit(Sort([Filter](Access))))`; the optimizer rewrites it.

use std::fmt;

use folio_proto::{OrderSpec, Predicate, Selector};

/// One operator in a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Read entries from the store.
    Access { selector: Selector },
    /// Keep entries that satisfy a predicate.
    Filter {
        predicate: Predicate,
        input: Box<PlanNode>,
    },
    /// Order entries by one or more keys.
    Sort {
        keys: Vec<OrderSpec>,
        input: Box<PlanNode>,
    },
    /// Skip `offset` entries and keep at most `limit`.
    Limit {
        offset: usize,
        limit: Option<usize>,
        input: Box<PlanNode>,
    },
    /// Turn entries into rows of the given property columns.
    Project {
        columns: Vec<String>,
        input: Box<PlanNode>,
    },
}

impl PlanNode {
    /// The node feeding this one, if any.
    pub fn input(&self) -> Option<&PlanNode> {
        match self {
            PlanNode::Access { .. } => None,
            PlanNode::Filter { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. }
            | PlanNode::Project { input, .. } => Some(input),
        }
    }

    /// Operator name.
    pub fn name(&self) -> &'static str {
        match self {
            PlanNode::Access { .. } => "Access",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Sort { .. } => "Sort",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Project { .. } => "Project",
        }
    }

    fn describe(&self) -> String {
        match self {
            PlanNode::Access { selector } => match &selector.predicate {
                Some(p) => format!("Access types={:?} predicate={:?}", selector.type_ids, p),
                None => format!("Access types={:?}", selector.type_ids),
            },
            PlanNode::Filter { predicate, .. } => format!("Filter {:?}", predicate),
            PlanNode::Sort { keys, .. } => {
                let keys: Vec<String> = keys
                    .iter()
                    .map(|k| format!("{} {:?}", k.property, k.direction))
                    .collect();
                format!("Sort [{}]", keys.join(", "))
            }
            PlanNode::Limit { offset, limit, .. } => match limit {
                Some(limit) => format!("Limit offset={} limit={}", offset, limit),
                None => format!("Limit offset={}", offset),
            },
            PlanNode::Project { columns, .. } => format!("Project [{}]", columns.join(", ")),
        }
    }
}

/// A plan passed from the planner through the optimizer to the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub root: PlanNode,
}

impl ExecutionPlan {
    pub fn new(root: PlanNode) -> Self {
        Self { root }
    }

    /// Nodes from the root down to the leaf.
    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        std::iter::successors(Some(&self.root), |node| node.input())
    }

    /// The storage selector at the leaf, if the plan has one.
    pub fn access(&self) -> Option<&Selector> {
        self.nodes().find_map(|node| match node {
            PlanNode::Access { selector } => Some(selector),
            _ => None,
        })
    }

    /// Output columns, if the plan ends in a projection.
    pub fn columns(&self) -> Option<&[String]> {
        match &self.root {
            PlanNode::Project { columns, .. } => Some(columns),
            _ => None,
        }
    }

    /// Operator names from the root down.
    pub fn shape(&self) -> Vec<&'static str> {
        self.nodes().map(PlanNode::name).collect()
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, node) in self.nodes().enumerate() {
            writeln!(f, "{:indent$}{}", "", node.describe(), indent = depth * 2)?;
        }
        Ok(())
    }
}
