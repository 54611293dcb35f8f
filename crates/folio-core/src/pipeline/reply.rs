//! Replies returned by the pipeline.

use folio_proto::{ContentEntry, EntryPage, IndexSummary, QueryModel, ResultSet};

use crate::query::Statistics;

/// Result rows of a processed query together with its phase timings.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    pub result_set: ResultSet,
    pub statistics: Statistics,
}

/// The answer to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A page of entries (`ReadChildEntries`, `ReadUnfiledEntries`).
    Entries(EntryPage),
    /// A single entry (`ReadContentEntry`).
    Entry(ContentEntry),
    /// An applied or staged index batch (`ModifyIndex`).
    Indexed(IndexSummary),
    /// Entries matched by a selector (`ExecuteSelector`).
    Selected(Vec<ContentEntry>),
    /// A parsed statement (`ParseStatement`).
    Parsed(QueryModel),
    /// Query results (`ProcessQuery`, `SubmitStatement`).
    Query(QueryResults),
    /// Acknowledgement with no payload (`Commit`, `RollBack`).
    Done,
}

impl Reply {
    /// Short name of the variant, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Reply::Entries(_) => "entries",
            Reply::Entry(_) => "entry",
            Reply::Indexed(_) => "indexed",
            Reply::Selected(_) => "selected",
            Reply::Parsed(_) => "parsed",
            Reply::Query(_) => "query",
            Reply::Done => "done",
        }
    }

    pub fn into_entries(self) -> Option<EntryPage> {
        match self {
            Reply::Entries(page) => Some(page),
            _ => None,
        }
    }

    pub fn into_entry(self) -> Option<ContentEntry> {
        match self {
            Reply::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn into_indexed(self) -> Option<IndexSummary> {
        match self {
            Reply::Indexed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn into_selected(self) -> Option<Vec<ContentEntry>> {
        match self {
            Reply::Selected(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn into_parsed(self) -> Option<QueryModel> {
        match self {
            Reply::Parsed(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_query(self) -> Option<QueryResults> {
        match self {
            Reply::Query(results) => Some(results),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Reply::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let reply = Reply::Entry(ContentEntry::document("d1", "a.txt"));
        assert_eq!(reply.name(), "entry");
        assert_eq!(reply.clone().into_entry().map(|e| e.id), Some("d1".to_string()));
        assert!(reply.into_entries().is_none());

        assert!(Reply::Done.is_done());
        assert_eq!(
            Reply::Indexed(IndexSummary::staged(2)).into_indexed(),
            Some(IndexSummary::staged(2))
        );
    }
}
