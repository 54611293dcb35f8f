//! Per-call invocation context.
//!
//! An [`InvocationContext`] is created once per external request and passed
//! by mutable reference through every stage the request reaches, including
//! sub-calls that re-enter the pipeline. It carries the caller's session, the
//! problems reported by query phases, an optional unit-of-work scope, a
//! cancellation signal and the statistics of the most recent query run.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use folio_proto::IndexChange;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::query::{QueryPhase, Statistics};

/// Caller identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session identifier.
    pub id: String,
    /// Authenticated principal, `anonymous` when none.
    pub principal: String,
}

impl Session {
    /// Create a session for a principal.
    pub fn new(id: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            principal: principal.into(),
        }
    }

    /// A session with no authenticated principal.
    pub fn anonymous() -> Self {
        Self::new("anonymous", "anonymous")
    }
}

/// A non-fatal issue reported by a query phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Phase that reported the problem.
    pub phase: QueryPhase,
    pub message: String,
}

impl Problem {
    pub fn new(phase: QueryPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.phase, self.message)
    }
}

/// Ordered list of problems reported during a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problems {
    items: Vec<Problem>,
}

impl Problems {
    /// Record a problem.
    pub fn add(&mut self, phase: QueryPhase, message: impl Into<String>) {
        self.items.push(Problem::new(phase, message));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.items.iter()
    }

    /// Problems reported by one phase.
    pub fn in_phase(&self, phase: QueryPhase) -> impl Iterator<Item = &Problem> {
        self.items.iter().filter(move |p| p.phase == phase)
    }

    pub fn as_slice(&self) -> &[Problem] {
        &self.items
    }

    /// Remove and return every recorded problem.
    pub fn take(&mut self) -> Vec<Problem> {
        std::mem::take(&mut self.items)
    }
}

/// Cancellation signal shared between a call and whoever may cancel it.
///
/// Cloning yields another handle to the same flag. Once raised the flag
/// stays raised.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Buffer of index changes belonging to one unit of work.
///
/// Scopes are handed to each request's context; clones share the buffer so
/// consecutive requests can stage changes and a later request can commit
/// them.
#[derive(Debug, Clone, Default)]
pub struct TransactionScope {
    pending: Arc<Mutex<Vec<IndexChange>>>,
}

impl TransactionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer changes. Returns the number of changes now pending.
    pub fn stage(&self, changes: impl IntoIterator<Item = IndexChange>) -> usize {
        let mut pending = self.pending.lock();
        pending.extend(changes);
        pending.len()
    }

    /// Remove and return the pending changes in staging order.
    pub fn take(&self) -> Vec<IndexChange> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Put changes back at the front of the buffer, ahead of anything staged
    /// since they were taken.
    pub fn restore(&self, changes: Vec<IndexChange>) {
        let mut pending = self.pending.lock();
        pending.splice(0..0, changes);
    }

    /// Drop every pending change. Returns how many were dropped.
    pub fn discard(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// Number of pending changes.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

/// State carried through one pipeline call.
#[derive(Debug)]
pub struct InvocationContext {
    session: Session,
    problems: Problems,
    transaction: Option<TransactionScope>,
    cancel: CancelToken,
    statistics: Option<Statistics>,
}

impl InvocationContext {
    /// Create a context for a session.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            problems: Problems::default(),
            transaction: None,
            cancel: CancelToken::new(),
            statistics: None,
        }
    }

    /// Create a context with an anonymous session.
    pub fn anonymous() -> Self {
        Self::new(Session::anonymous())
    }

    /// Attach a unit-of-work scope.
    pub fn with_transaction(mut self, scope: TransactionScope) -> Self {
        self.transaction = Some(scope);
        self
    }

    /// Use an existing cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn problems(&self) -> &Problems {
        &self.problems
    }

    pub fn problems_mut(&mut self) -> &mut Problems {
        &mut self.problems
    }

    /// Record a problem for a phase.
    pub fn add_problem(&mut self, phase: QueryPhase, message: impl Into<String>) {
        self.problems.add(phase, message);
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    pub fn transaction(&self) -> Option<&TransactionScope> {
        self.transaction.as_ref()
    }

    /// A handle that cancels this call from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    /// Fail with [`Error::Canceled`] if cancellation was requested.
    pub fn check_canceled(&self) -> Result<(), Error> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }

    /// Statistics of the most recent query run in this call.
    ///
    /// Updated at every phase boundary, so the value is available even when
    /// the run failed or was canceled.
    pub fn statistics(&self) -> Option<Statistics> {
        self.statistics
    }

    pub fn set_statistics(&mut self, statistics: Statistics) {
        self.statistics = Some(statistics);
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
