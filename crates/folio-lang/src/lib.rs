//! CMIS SQL for Folio
//!
//! This crate parses the CMIS query language subset Folio understands into a
//! [`folio_proto::QueryModel`].
//!
//! # Syntax
//!
//! ```text
//! SELECT * FROM cmis:document
//! SELECT cmis:objectId, cmis:name FROM cmis:folder WHERE IN_FOLDER('root')
//! SELECT * FROM cmis:document WHERE cmis:name LIKE 'report%' AND cmis:contentStreamLength > 0
//! SELECT * FROM cmis:document WHERE cmis:createdBy IN ('alice', 'bob') ORDER BY cmis:name DESC
//! ```
//!
//! Keywords are case-insensitive. Source and property ids are taken verbatim;
//! validating them against a type catalog is left to the caller.
//!
//! # Usage
//!
//! ```rust
//! use folio_lang::parse;
//!
//! let model = parse("SELECT * FROM cmis:document WHERE cmis:name = 'a.txt'").unwrap();
//! assert_eq!(model.source, "cmis:document");
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use error::ParseError;
pub use lexer::{Keyword, Token};
pub use span::Span;

use folio_proto::QueryModel;

/// Parse a statement into a query model.
///
/// # Example
///
/// ```rust
/// use folio_lang::parse;
///
/// let model = parse("SELECT cmis:name FROM cmis:folder").unwrap();
/// ```
pub fn parse(source: &str) -> Result<QueryModel, ParseError> {
    parser::parse(source)
}

/// Tokenize a source string (for debugging/testing).
///
/// # Example
///
/// ```rust
/// use folio_lang::tokenize;
///
/// let tokens = tokenize("SELECT * FROM cmis:document");
/// assert_eq!(tokens.len(), 4);
/// ```
pub fn tokenize(source: &str) -> Vec<lexer::SpannedToken> {
    lexer::tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_proto::{Predicate, Projection};

    #[test]
    fn test_parse_full_statement() {
        let source = r#"
            SELECT cmis:objectId, cmis:name
            FROM cmis:document
            WHERE IN_FOLDER('f-1') AND cmis:name LIKE '%.pdf'
            ORDER BY cmis:name
        "#;
        let model = parse(source).unwrap();
        assert_eq!(model.source, "cmis:document");
        assert!(matches!(model.projection, Projection::Properties(ref p) if p.len() == 2));
        assert!(matches!(model.predicate, Some(Predicate::And(_))));
        assert_eq!(model.order_by.len(), 1);
    }

    #[test]
    fn test_error_with_source_context() {
        let source = "SELECT * FROM cmis:document WHERE cmis:name == 'x'";
        let err = parse(source).unwrap_err();
        let formatted = err.format_with_source(source);
        assert!(formatted.contains("line 1"));
        assert!(formatted.contains("error"));
        assert!(formatted.contains("hint"));
    }

    #[test]
    fn test_multiline_error_position() {
        let source = "SELECT *\nFROM\n";
        let err = parse(source).unwrap_err();
        assert!(err.message.contains("unexpected end of input"));
    }
}
