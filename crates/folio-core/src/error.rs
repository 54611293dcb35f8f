//! Core error types.

use folio_proto::CommandKind;
use thiserror::Error;

use crate::context::Problem;
use crate::query::QueryPhase;

/// Boxed cause carried by [`Error::InvalidQuery`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core repository errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The statement could not be turned into a query model.
    #[error("invalid query: {source}")]
    InvalidQuery {
        /// The raw statement text.
        statement: String,
        #[source]
        source: BoxError,
    },

    /// A query run stopped at a checkpoint because problems were recorded.
    #[error("query halted after {phase} with {} problem(s): {}", .problems.len(), first_message(.problems))]
    QueryHalted {
        phase: QueryPhase,
        problems: Vec<Problem>,
    },

    /// No stage in the pipeline handled the command.
    #[error("no stage handled the {command} command")]
    NoHandler { command: CommandKind },

    /// The call was canceled.
    #[error("operation canceled")]
    Canceled,

    /// A chain edit addressed a position outside the chain.
    #[error("position {position} out of range for pipeline of length {len}")]
    OutOfRange { position: usize, len: usize },

    /// Entry not found.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// Entry already exists.
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] folio_proto::Error),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Whether this error is a cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}

fn first_message(problems: &[Problem]) -> &str {
    problems.first().map(|p| p.message.as_str()).unwrap_or("")
}
