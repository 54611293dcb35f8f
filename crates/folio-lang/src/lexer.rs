//! Lexer for CMIS SQL using logos.
//!
//! Keywords are case-insensitive and are recognised from identifier tokens by
//! [`Keyword::from_ident`] so that qualified property ids such as
//! `cmis:name` never collide with them.

use crate::span::Span;
use logos::Logos;

/// Token types for CMIS SQL.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Identifier, optionally namespace-qualified (cmis:name)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(:[a-zA-Z_][a-zA-Z0-9_]*)?", |lex| lex.slice().to_string())]
    Ident(String),

    // String literal: single-quoted, '' or \' escapes a quote
    #[regex(r"'([^'\\]|\\.|'')*'", |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    String(String),

    // Integer literal
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Decimal literal
    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // Comparison operators
    #[token("=")]
    Eq,
    #[token("<>")]
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Punctuation
    #[token("*")]
    Star,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
}

/// Reserved words of the supported CMIS SQL subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    Where,
    Order,
    By,
    Asc,
    Desc,
    And,
    Or,
    Not,
    In,
    Like,
    Is,
    Null,
    True,
    False,
    InFolder,
}

impl Keyword {
    /// Classify an identifier as a keyword, ignoring ASCII case.
    pub fn from_ident(ident: &str) -> Option<Keyword> {
        const KEYWORDS: [(&str, Keyword); 17] = [
            ("select", Keyword::Select),
            ("from", Keyword::From),
            ("where", Keyword::Where),
            ("order", Keyword::Order),
            ("by", Keyword::By),
            ("asc", Keyword::Asc),
            ("desc", Keyword::Desc),
            ("and", Keyword::And),
            ("or", Keyword::Or),
            ("not", Keyword::Not),
            ("in", Keyword::In),
            ("like", Keyword::Like),
            ("is", Keyword::Is),
            ("null", Keyword::Null),
            ("true", Keyword::True),
            ("false", Keyword::False),
            ("in_folder", Keyword::InFolder),
        ];

        KEYWORDS
            .iter()
            .find(|(text, _)| ident.eq_ignore_ascii_case(text))
            .map(|(_, kw)| *kw)
    }

    /// The keyword as written in statements.
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::In => "IN",
            Keyword::Like => "LIKE",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::InFolder => "IN_FOLDER",
        }
    }
}

impl Token {
    /// The keyword this token spells, if any.
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Token::Ident(name) => Keyword::from_ident(name),
            _ => None,
        }
    }

    /// Whether this token is the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }
}

/// Unescape a string literal body.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                result.push('\'');
            }
            c => result.push(c),
        }
    }

    result
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer that produces spanned tokens.
///
/// Lexing stops at the first unrecognised input; its span is kept in
/// [`Lexer::invalid`] so the parser can report it.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<SpannedToken>>,
    invalid: Option<Span>,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
            invalid: None,
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Option<&SpannedToken> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_inner());
        }
        self.peeked.as_ref().and_then(|o| o.as_ref())
    }

    /// Consume the next token.
    pub fn next_token(&mut self) -> Option<SpannedToken> {
        self.peeked.take().unwrap_or_else(|| self.next_inner())
    }

    /// Span of the first unrecognised input, if lexing stopped early.
    pub fn invalid(&self) -> Option<Span> {
        self.invalid
    }

    fn next_inner(&mut self) -> Option<SpannedToken> {
        if self.invalid.is_some() {
            return None;
        }
        match self.inner.next()? {
            Ok(token) => Some(SpannedToken {
                token,
                span: self.inner.span().into(),
            }),
            Err(()) => {
                self.invalid = Some(self.inner.span().into());
                None
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = SpannedToken;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a source string into a vector of spanned tokens.
pub fn tokenize(source: &str) -> Vec<SpannedToken> {
    Lexer::new(source).collect()
}
