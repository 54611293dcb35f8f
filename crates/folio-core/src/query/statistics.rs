//! Phase timing statistics for query runs.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::time::Duration;

/// Durations of the planning, optimization and execution phases of a query.
///
/// A phase that did not run has no duration. Values are never mutated: each
/// phase boundary produces a new value with one more duration set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    planning: Option<Duration>,
    optimization: Option<Duration>,
    execution: Option<Duration>,
}

impl Statistics {
    /// Statistics with no recorded phases.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy with the planning duration set.
    pub fn with_planning(self, duration: Duration) -> Self {
        Self {
            planning: Some(duration),
            ..self
        }
    }

    /// A copy with the optimization duration set.
    pub fn with_optimization(self, duration: Duration) -> Self {
        Self {
            optimization: Some(duration),
            ..self
        }
    }

    /// A copy with the execution duration set.
    pub fn with_execution(self, duration: Duration) -> Self {
        Self {
            execution: Some(duration),
            ..self
        }
    }

    pub fn planning(&self) -> Option<Duration> {
        self.planning
    }

    pub fn optimization(&self) -> Option<Duration> {
        self.optimization
    }

    pub fn execution(&self) -> Option<Duration> {
        self.execution
    }

    /// Sum of every recorded phase.
    pub fn total(&self) -> Duration {
        [self.planning, self.optimization, self.execution]
            .into_iter()
            .flatten()
            .sum()
    }

    /// Whether no phase was recorded.
    pub fn is_empty(&self) -> bool {
        self.planning.is_none() && self.optimization.is_none() && self.execution.is_none()
    }
}

fn add_phase(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl Add for Statistics {
    type Output = Statistics;

    /// Phase-wise sum. A phase is present when either side recorded it.
    fn add(self, rhs: Statistics) -> Statistics {
        Statistics {
            planning: add_phase(self.planning, rhs.planning),
            optimization: add_phase(self.optimization, rhs.optimization),
            execution: add_phase(self.execution, rhs.execution),
        }
    }
}

impl Sum for Statistics {
    fn sum<I: Iterator<Item = Statistics>>(iter: I) -> Statistics {
        iter.fold(Statistics::new(), Add::add)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = |d: Option<Duration>| match d {
            Some(d) => format!("{:?}", d),
            None => "-".to_string(),
        };
        write!(
            f,
            "planning={} optimization={} execution={} total={:?}",
            phase(self.planning),
            phase(self.optimization),
            phase(self.execution),
            self.total()
        )
    }
}
