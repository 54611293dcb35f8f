//! Model error types.

use thiserror::Error;

/// Errors raised while building or decoding model values.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A value could not be parsed from text.
    #[error("invalid {kind}: '{value}'")]
    InvalidValue { kind: &'static str, value: String },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}
