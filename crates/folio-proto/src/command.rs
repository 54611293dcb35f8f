//! Repository commands routed through the pipeline.
//!
//! A [`Command`] describes one repository operation and nothing about how it
//! will be handled. Commands are never mutated after construction; a stage
//! that wants to change an operation builds a new command.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::PagingParams;
use crate::index::IndexChange;
use crate::query::{QueryModel, Selector, StatementType};

/// List the children of a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadChildEntries {
    pub parent_id: String,
    pub paging: PagingParams,
}

/// Read a single entry by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadContentEntry {
    pub node_id: String,
}

/// List entries that are not filed in any folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadUnfiledEntries {
    pub paging: PagingParams,
}

/// Apply a set of index changes as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyIndex {
    pub changes: Vec<IndexChange>,
}

/// Run a storage-level selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteSelector {
    pub selector: Selector,
}

/// Plan, optimize and execute a parsed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessQuery {
    pub model: QueryModel,
}

/// Turn statement text into a query model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStatement {
    pub statement: String,
    pub statement_type: StatementType,
}

/// Parse and process statement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitStatement {
    pub statement: String,
    pub statement_type: StatementType,
}

/// A repository operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    ReadChildEntries(ReadChildEntries),
    ReadContentEntry(ReadContentEntry),
    ReadUnfiledEntries(ReadUnfiledEntries),
    ModifyIndex(ModifyIndex),
    ExecuteSelector(ExecuteSelector),
    ProcessQuery(ProcessQuery),
    ParseStatement(ParseStatement),
    SubmitStatement(SubmitStatement),
    Commit,
    RollBack,
}

/// The kind of a command, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ReadChildEntries,
    ReadContentEntry,
    ReadUnfiledEntries,
    ModifyIndex,
    ExecuteSelector,
    ProcessQuery,
    ParseStatement,
    SubmitStatement,
    Commit,
    RollBack,
}

impl CommandKind {
    /// Every command kind, in declaration order.
    pub const ALL: [CommandKind; 10] = [
        CommandKind::ReadChildEntries,
        CommandKind::ReadContentEntry,
        CommandKind::ReadUnfiledEntries,
        CommandKind::ModifyIndex,
        CommandKind::ExecuteSelector,
        CommandKind::ProcessQuery,
        CommandKind::ParseStatement,
        CommandKind::SubmitStatement,
        CommandKind::Commit,
        CommandKind::RollBack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::ReadChildEntries => "read_child_entries",
            CommandKind::ReadContentEntry => "read_content_entry",
            CommandKind::ReadUnfiledEntries => "read_unfiled_entries",
            CommandKind::ModifyIndex => "modify_index",
            CommandKind::ExecuteSelector => "execute_selector",
            CommandKind::ProcessQuery => "process_query",
            CommandKind::ParseStatement => "parse_statement",
            CommandKind::SubmitStatement => "submit_statement",
            CommandKind::Commit => "commit",
            CommandKind::RollBack => "roll_back",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    /// Create a child listing command.
    pub fn read_children(parent_id: impl Into<String>, paging: PagingParams) -> Self {
        Command::ReadChildEntries(ReadChildEntries {
            parent_id: parent_id.into(),
            paging,
        })
    }

    /// Create a single entry read.
    pub fn read_entry(node_id: impl Into<String>) -> Self {
        Command::ReadContentEntry(ReadContentEntry {
            node_id: node_id.into(),
        })
    }

    /// Create an unfiled listing command.
    pub fn read_unfiled(paging: PagingParams) -> Self {
        Command::ReadUnfiledEntries(ReadUnfiledEntries { paging })
    }

    /// Create an index modification command.
    pub fn modify_index(changes: Vec<IndexChange>) -> Self {
        Command::ModifyIndex(ModifyIndex { changes })
    }

    /// Create a selector execution command.
    pub fn execute_selector(selector: Selector) -> Self {
        Command::ExecuteSelector(ExecuteSelector { selector })
    }

    /// Create a query processing command.
    pub fn process_query(model: QueryModel) -> Self {
        Command::ProcessQuery(ProcessQuery { model })
    }

    /// Create a parse command.
    pub fn parse_statement(
        statement: impl Into<String>,
        statement_type: impl Into<StatementType>,
    ) -> Self {
        Command::ParseStatement(ParseStatement {
            statement: statement.into(),
            statement_type: statement_type.into(),
        })
    }

    /// Create a statement submission command.
    pub fn submit_statement(
        statement: impl Into<String>,
        statement_type: impl Into<StatementType>,
    ) -> Self {
        Command::SubmitStatement(SubmitStatement {
            statement: statement.into(),
            statement_type: statement_type.into(),
        })
    }

    /// The kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ReadChildEntries(_) => CommandKind::ReadChildEntries,
            Command::ReadContentEntry(_) => CommandKind::ReadContentEntry,
            Command::ReadUnfiledEntries(_) => CommandKind::ReadUnfiledEntries,
            Command::ModifyIndex(_) => CommandKind::ModifyIndex,
            Command::ExecuteSelector(_) => CommandKind::ExecuteSelector,
            Command::ProcessQuery(_) => CommandKind::ProcessQuery,
            Command::ParseStatement(_) => CommandKind::ParseStatement,
            Command::SubmitStatement(_) => CommandKind::SubmitStatement,
            Command::Commit => CommandKind::Commit,
            Command::RollBack => CommandKind::RollBack,
        }
    }

    /// Whether this command changes repository state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::ModifyIndex(_) | Command::Commit | Command::RollBack
        )
    }
}
