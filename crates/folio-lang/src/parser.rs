//! Recursive descent parser for CMIS SQL.
//!
//! Supported grammar:
//!
//! ```text
//! statement  := SELECT select_list FROM ident [WHERE condition]
//!               [ORDER BY ordering (',' ordering)*] [';']
//! select_list:= '*' | ident (',' ident)*
//! condition  := and_cond (OR and_cond)*
//! and_cond   := not_cond (AND not_cond)*
//! not_cond   := NOT not_cond | primary
//! primary    := '(' condition ')'
//!             | IN_FOLDER '(' string ')'
//!             | ident cmp_op literal
//!             | ident [NOT] IN '(' literal (',' literal)* ')'
//!             | ident [NOT] LIKE string
//!             | ident IS [NOT] NULL
//! ordering   := ident [ASC | DESC]
//! ```

use crate::error::ParseError;
use crate::lexer::{Keyword, Lexer, SpannedToken, Token};
use crate::span::Span;
use folio_proto::{
    CompareOp, OrderSpec, PagingParams, Predicate, Projection, QueryModel, SortDirection, Value,
};

/// Parser for CMIS SQL statements.
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source.
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: Lexer::new(source),
            source,
        }
    }

    /// Parse a complete `SELECT` statement.
    pub fn parse_query(&mut self) -> Result<QueryModel, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let projection = self.parse_select_list()?;

        self.expect_keyword(Keyword::From)?;
        let (source, _) = self.expect_ident()?;

        let predicate = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        let order_by = if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            self.parse_order_list()?
        } else {
            Vec::new()
        };

        self.eat_token(&Token::Semicolon);
        self.expect_end()?;

        Ok(QueryModel {
            source,
            projection,
            predicate,
            order_by,
            paging: PagingParams::default(),
        })
    }

    /// Parse `*` or a comma-separated property list.
    fn parse_select_list(&mut self) -> Result<Projection, ParseError> {
        if self.eat_token(&Token::Star) {
            return Ok(Projection::All);
        }

        let mut properties = vec![self.expect_ident()?.0];
        while self.eat_token(&Token::Comma) {
            properties.push(self.expect_ident()?.0);
        }
        Ok(Projection::Properties(properties))
    }

    /// Parse a condition (with support for AND, OR and NOT).
    fn parse_condition(&mut self) -> Result<Predicate, ParseError> {
        let mut parts = vec![self.parse_and_condition()?];
        while self.eat_keyword(Keyword::Or) {
            parts.push(self.parse_and_condition()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::Or(parts)
        })
    }

    fn parse_and_condition(&mut self) -> Result<Predicate, ParseError> {
        let mut parts = vec![self.parse_not_condition()?];
        while self.eat_keyword(Keyword::And) {
            parts.push(self.parse_not_condition()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::And(parts)
        })
    }

    fn parse_not_condition(&mut self) -> Result<Predicate, ParseError> {
        if self.eat_keyword(Keyword::Not) {
            let inner = self.parse_not_condition()?;
            return Ok(Predicate::Not(Box::new(inner)));
        }
        self.parse_primary_condition()
    }

    /// Parse a parenthesised condition, `IN_FOLDER`, or a property test.
    fn parse_primary_condition(&mut self) -> Result<Predicate, ParseError> {
        if self.eat_token(&Token::LParen) {
            let inner = self.parse_condition()?;
            self.expect_token(Token::RParen)?;
            return Ok(inner);
        }

        if self.eat_keyword(Keyword::InFolder) {
            self.expect_token(Token::LParen)?;
            let (folder_id, _) = self.parse_string_literal()?;
            self.expect_token(Token::RParen)?;
            return Ok(Predicate::InFolder(folder_id));
        }

        let (property, property_span) = self.expect_ident()?;
        let op_tok = self.next_token()?;

        let op = match op_tok.token {
            Token::Eq => Some(CompareOp::Eq),
            Token::Ne => Some(CompareOp::Ne),
            Token::Lt => Some(CompareOp::Lt),
            Token::Le => Some(CompareOp::Le),
            Token::Gt => Some(CompareOp::Gt),
            Token::Ge => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            let value = self.parse_literal()?;
            return Ok(Predicate::Compare {
                property,
                op,
                value,
            });
        }

        match op_tok.token.keyword() {
            Some(Keyword::Is) => {
                let negated = self.eat_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                Ok(Predicate::IsNull { property, negated })
            }
            Some(Keyword::In) => {
                let values = self.parse_literal_list()?;
                Ok(Predicate::In {
                    property,
                    values,
                    negated: false,
                })
            }
            Some(Keyword::Like) => {
                let (pattern, _) = self.parse_string_literal()?;
                Ok(Predicate::Like {
                    property,
                    pattern,
                    negated: false,
                })
            }
            Some(Keyword::Not) => {
                let next = self.next_token()?;
                match next.token.keyword() {
                    Some(Keyword::In) => Ok(Predicate::In {
                        property,
                        values: self.parse_literal_list()?,
                        negated: true,
                    }),
                    Some(Keyword::Like) => Ok(Predicate::Like {
                        property,
                        pattern: self.parse_string_literal()?.0,
                        negated: true,
                    }),
                    _ => Err(ParseError::new(
                        format!("expected IN or LIKE after NOT, found {}", describe(&next.token)),
                        next.span,
                    )),
                }
            }
            _ => Err(ParseError::new(
                format!(
                    "expected comparison operator after '{}', found {}",
                    property,
                    describe(&op_tok.token)
                ),
                property_span.merge(op_tok.span),
            )),
        }
    }

    /// Parse `( literal, ... )`.
    fn parse_literal_list(&mut self) -> Result<Vec<Value>, ParseError> {
        let open = self.expect_token(Token::LParen)?;
        if self.peek_is(&Token::RParen) {
            return Err(ParseError::new("IN list must not be empty", open.span));
        }

        let mut values = vec![self.parse_literal()?];
        while self.eat_token(&Token::Comma) {
            values.push(self.parse_literal()?);
        }
        self.expect_token(Token::RParen)?;
        Ok(values)
    }

    /// Parse `ordering (, ordering)*`.
    fn parse_order_list(&mut self) -> Result<Vec<OrderSpec>, ParseError> {
        let mut specs = Vec::new();
        loop {
            let (property, _) = self.expect_ident()?;
            let direction = if self.eat_keyword(Keyword::Desc) {
                SortDirection::Desc
            } else {
                self.eat_keyword(Keyword::Asc);
                SortDirection::Asc
            };
            specs.push(OrderSpec {
                property,
                direction,
            });

            if !self.eat_token(&Token::Comma) {
                return Ok(specs);
            }
        }
    }

    /// Parse a literal value.
    fn parse_literal(&mut self) -> Result<Value, ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Int(i) => Ok(Value::Integer(i)),
            Token::Float(f) => Ok(Value::Decimal(f)),
            Token::String(s) => Ok(Value::String(s)),
            ref t if t.is_keyword(Keyword::True) => Ok(Value::Bool(true)),
            ref t if t.is_keyword(Keyword::False) => Ok(Value::Bool(false)),
            ref t if t.is_keyword(Keyword::Null) => Err(ParseError::new(
                "NULL cannot be compared with an operator",
                tok.span,
            )
            .with_hint("use IS NULL or IS NOT NULL")),
            Token::Eq => Err(ParseError::new(
                format!("expected literal value, found {}", describe(&tok.token)),
                tok.span,
            )
            .with_hint("use '=' for equality comparison")),
            _ => Err(ParseError::new(
                format!("expected literal value, found {}", describe(&tok.token)),
                tok.span,
            )),
        }
    }

    /// Parse a string literal specifically.
    fn parse_string_literal(&mut self) -> Result<(String, Span), ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::String(s) => Ok((s, tok.span)),
            _ => Err(ParseError::new(
                format!("expected string literal, found {}", describe(&tok.token)),
                tok.span,
            )),
        }
    }

    /// Expect and consume a non-reserved identifier.
    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Ident(name) if Keyword::from_ident(&name).is_none() => Ok((name, tok.span)),
            other => Err(ParseError::new(
                format!("expected identifier, found {}", describe(&other)),
                tok.span,
            )),
        }
    }

    /// Expect and consume a keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if tok.token.is_keyword(keyword) {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {}, found {}", keyword.as_str(), describe(&tok.token)),
                tok.span,
            ))
        }
    }

    /// Expect and consume a specific token.
    fn expect_token(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {}, found {}", describe(&expected), describe(&tok.token)),
                tok.span,
            ))
        }
    }

    /// Consume the keyword if it is next.
    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let matched = self
            .lexer
            .peek()
            .is_some_and(|tok| tok.token.is_keyword(keyword));
        if matched {
            self.lexer.next_token();
        }
        matched
    }

    /// Consume the token if it is next.
    fn eat_token(&mut self, token: &Token) -> bool {
        let matched = self.peek_is(token);
        if matched {
            self.lexer.next_token();
        }
        matched
    }

    fn peek_is(&mut self, token: &Token) -> bool {
        self.lexer.peek().is_some_and(|tok| &tok.token == token)
    }

    /// Require that all input was consumed.
    fn expect_end(&mut self) -> Result<(), ParseError> {
        if let Some(tok) = self.lexer.next_token() {
            return Err(ParseError::new(
                format!("unexpected {} after end of statement", describe(&tok.token)),
                tok.span,
            ));
        }
        match self.lexer.invalid() {
            Some(span) => Err(self.unrecognized(span)),
            None => Ok(()),
        }
    }

    /// Get the next token or error if EOF.
    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        match self.lexer.next_token() {
            Some(tok) => Ok(tok),
            None => match self.lexer.invalid() {
                Some(span) => Err(self.unrecognized(span)),
                None => Err(ParseError::new(
                    "unexpected end of input",
                    Span::new(self.source.len(), self.source.len()),
                )),
            },
        }
    }

    fn unrecognized(&self, span: Span) -> ParseError {
        let text = span.slice(self.source).unwrap_or_default();
        ParseError::new(format!("unrecognized input '{}'", text), span)
    }
}

/// Describe a token for error messages.
fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => match Keyword::from_ident(name) {
            Some(kw) => format!("keyword {}", kw.as_str()),
            None => format!("identifier '{}'", name),
        },
        Token::String(s) => format!("string '{}'", s),
        Token::Int(i) => format!("integer {}", i),
        Token::Float(f) => format!("decimal {}", f),
        Token::Eq => "'='".into(),
        Token::Ne => "'<>'".into(),
        Token::Le => "'<='".into(),
        Token::Ge => "'>='".into(),
        Token::Lt => "'<'".into(),
        Token::Gt => "'>'".into(),
        Token::Star => "'*'".into(),
        Token::Comma => "','".into(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Semicolon => "';'".into(),
    }
}

/// Parse a CMIS SQL statement into a query model.
pub fn parse(source: &str) -> Result<QueryModel, ParseError> {
    Parser::new(source).parse_query()
}
