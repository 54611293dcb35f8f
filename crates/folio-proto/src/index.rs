//! Index change sets.

use serde::{Deserialize, Serialize};

use crate::entry::ContentEntry;

/// A single change to the content index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexChange {
    /// Index a new entry. Fails if the id is already indexed.
    Add(ContentEntry),
    /// Replace an indexed entry. Fails if the id is not indexed.
    Update(ContentEntry),
    /// Remove an entry by id. Fails if the id is not indexed.
    Remove(String),
}

impl IndexChange {
    /// The id of the entry this change touches.
    pub fn entry_id(&self) -> &str {
        match self {
            IndexChange::Add(entry) | IndexChange::Update(entry) => &entry.id,
            IndexChange::Remove(id) => id,
        }
    }
}

/// Summary of an applied or staged change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Changes buffered in a unit of work rather than applied.
    pub staged: usize,
}

impl IndexSummary {
    /// Summary for a set of changes that were applied.
    pub fn applied(changes: &[IndexChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change {
                IndexChange::Add(_) => summary.added += 1,
                IndexChange::Update(_) => summary.updated += 1,
                IndexChange::Remove(_) => summary.removed += 1,
            }
        }
        summary
    }

    /// Summary for changes that were only staged.
    pub fn staged(count: usize) -> Self {
        Self {
            staged: count,
            ..Default::default()
        }
    }

    /// Total number of applied changes.
    pub fn total_applied(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let changes = vec![
            IndexChange::Add(ContentEntry::document("a", "a")),
            IndexChange::Add(ContentEntry::document("b", "b")),
            IndexChange::Update(ContentEntry::document("c", "c")),
            IndexChange::Remove("d".into()),
        ];
        let summary = IndexSummary::applied(&changes);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.total_applied(), 4);
        assert_eq!(changes[3].entry_id(), "d");
    }
}
