//! Statement parsing.

use std::sync::Arc;

use folio_lang::ParseError;
use folio_proto::{QueryModel, StatementType};
use thiserror::Error;

use crate::catalog::TypeCatalog;
use crate::error::BoxError;

/// Turns statement text into a query model.
///
/// Failures are returned as an opaque cause; the engine wraps them into
/// [`Error::InvalidQuery`](crate::Error::InvalidQuery).
pub trait StatementParser: Send + Sync {
    fn parse(&self, statement: &str, statement_type: &StatementType)
        -> Result<QueryModel, BoxError>;
}

/// Why a statement was rejected.
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("unsupported statement type '{0}'")]
    UnsupportedType(String),

    #[error("{message} at offset {offset}")]
    Syntax {
        message: String,
        offset: usize,
        #[source]
        source: ParseError,
    },

    #[error("unknown source '{0}'")]
    UnknownSource(String),
}

impl From<ParseError> for StatementError {
    fn from(err: ParseError) -> Self {
        StatementError::Syntax {
            message: err.message.clone(),
            offset: err.span.start,
            source: err,
        }
    }
}

/// Parser for CMIS SQL statements whose source must exist in a catalog.
pub struct CmisSqlParser {
    catalog: Arc<TypeCatalog>,
}

impl CmisSqlParser {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }

    fn parse_checked(
        &self,
        statement: &str,
        statement_type: &StatementType,
    ) -> Result<QueryModel, StatementError> {
        if *statement_type != StatementType::CmisSql {
            return Err(StatementError::UnsupportedType(
                statement_type.as_str().to_string(),
            ));
        }

        let model = folio_lang::parse(statement)?;
        if !self.catalog.contains(&model.source) {
            return Err(StatementError::UnknownSource(model.source));
        }
        Ok(model)
    }
}

impl StatementParser for CmisSqlParser {
    fn parse(
        &self,
        statement: &str,
        statement_type: &StatementType,
    ) -> Result<QueryModel, BoxError> {
        Ok(self.parse_checked(statement, statement_type)?)
    }
}
