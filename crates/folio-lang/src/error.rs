//! Statement errors with source positions.

use thiserror::Error;

use crate::span::{offset_to_line_col, Span};

/// A statement that could not be tokenized or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// Byte range of the offending input; empty at end of input.
    pub span: Span,
    /// Suggested fix, rendered under the quoted line.
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Attach a suggested fix.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// 1-based line and column of the error in `source`.
    pub fn position(&self, source: &str) -> (usize, usize) {
        offset_to_line_col(source, self.span.start)
    }

    /// Render a report that quotes the offending line:
    ///
    /// ```text
    /// error: expected literal value, found '='
    ///  --> line 1, column 46
    ///   |
    /// 1 | SELECT * FROM cmis:document WHERE cmis:name == 'x'
    ///   |                                              ^
    ///   = hint: use '=' for equality comparison
    /// ```
    pub fn format_with_source(&self, source: &str) -> String {
        let (line, col) = self.position(source);
        let pad = " ".repeat(line.to_string().len());

        let mut report = vec![
            format!("error: {}", self.message),
            format!("{pad}--> line {line}, column {col}"),
        ];

        if let Some(text) = source.lines().nth(line - 1) {
            let room = text.chars().count().saturating_sub(col - 1).max(1);
            let marker = "^".repeat(self.span.len().clamp(1, room));
            report.push(format!("{pad} |"));
            report.push(format!("{line} | {text}"));
            report.push(format!("{pad} | {}{marker}", " ".repeat(col - 1)));
        }

        if let Some(hint) = &self.hint {
            report.push(format!("{pad} = hint: {hint}"));
        }

        report.join("\n") + "\n"
    }
}
