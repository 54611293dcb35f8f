//! Content store interface.

use folio_proto::{ContentEntry, IndexChange, IndexSummary, Selector};

use crate::error::Error;

/// Storage the terminal pipeline stage and the query processor read from.
pub trait ContentStore: Send + Sync {
    /// Read one entry by id.
    fn get_entry(&self, id: &str) -> Result<Option<ContentEntry>, Error>;

    /// Direct children of a folder, ordered by name then id.
    fn children(&self, parent_id: &str) -> Result<Vec<ContentEntry>, Error>;

    /// Fileable non-folder entries with no parent, ordered by name then id.
    fn unfiled(&self) -> Result<Vec<ContentEntry>, Error>;

    /// Apply a batch of index changes entirely or not at all.
    fn apply(&self, changes: &[IndexChange]) -> Result<IndexSummary, Error>;

    /// Entries of the selector's types that satisfy its predicate, ordered
    /// by id.
    fn select(&self, selector: &Selector) -> Result<Vec<ContentEntry>, Error>;

    /// Persist pending writes.
    fn flush(&self) -> Result<(), Error>;
}
