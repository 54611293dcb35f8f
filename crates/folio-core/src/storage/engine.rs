//! Sled-backed content store.

use std::collections::{BTreeMap, BTreeSet};

use folio_proto::{ContentEntry, IndexChange, IndexSummary, Selector};
use parking_lot::Mutex;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{Db, Transactional, Tree};
use tracing::{debug, instrument};

use super::{ContentStore, StorageConfig};
use crate::error::Error;
use crate::query::FilterEvaluator;

/// Tree name for serialized entries, keyed by id.
const ENTRIES_TREE: &str = "entries";

/// Tree name for the folder index (parent_id + id -> empty).
const CHILDREN_TREE: &str = "index:children";

/// Tree name for the type index (type_id + id -> empty).
const TYPE_TREE: &str = "index:type";

type TxResult<T> = Result<T, ConflictableTransactionError<Error>>;

/// Content store on top of sled.
pub struct SledContentStore {
    db: Db,
    entries: Tree,
    children: Tree,
    types: Tree,
    /// Serializes batch validation and commit.
    writer: Mutex<()>,
}

impl SledContentStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let entries = db.open_tree(ENTRIES_TREE)?;
        let children = db.open_tree(CHILDREN_TREE)?;
        let types = db.open_tree(TYPE_TREE)?;

        Ok(Self {
            db,
            entries,
            children,
            types,
            writer: Mutex::new(()),
        })
    }

    /// Check if the store was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get store size in bytes.
    pub fn size_on_disk(&self) -> Result<u64, Error> {
        Ok(self.db.size_on_disk()?)
    }

    fn load(&self, id: &[u8]) -> Result<Option<ContentEntry>, Error> {
        match self.entries.get(id)? {
            Some(bytes) => Ok(Some(ContentEntry::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load every entry whose id follows `prefix` in an index tree.
    fn load_indexed(&self, index: &Tree, prefix: &[u8]) -> Result<Vec<ContentEntry>, Error> {
        let mut out = Vec::new();
        for item in index.scan_prefix(prefix) {
            let (key, _) = item?;
            let id = &key[prefix.len()..];
            match self.load(id)? {
                Some(entry) => out.push(entry),
                None => {
                    return Err(Error::InvalidData(format!(
                        "index refers to missing entry '{}'",
                        String::from_utf8_lossy(id)
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Check a batch against the current contents, in batch order.
    fn validate(&self, changes: &[IndexChange]) -> Result<(), Error> {
        // id -> whether it exists after the changes seen so far
        let mut overlay: BTreeMap<&str, bool> = BTreeMap::new();

        for change in changes {
            let id = change.entry_id();
            if id.is_empty() {
                return Err(Error::InvalidData("entry id must not be empty".to_string()));
            }
            check_key_part("entry id", id)?;
            if let IndexChange::Add(entry) | IndexChange::Update(entry) = change {
                check_key_part("type id", &entry.type_id)?;
                if let Some(parent) = &entry.parent_id {
                    check_key_part("parent id", parent)?;
                }
                if let Some((property, _)) = entry
                    .properties
                    .iter()
                    .find(|(_, v)| v.as_f64().is_some_and(|f| !f.is_finite()))
                {
                    return Err(Error::InvalidData(format!(
                        "property '{property}' of '{id}' is not a finite number"
                    )));
                }
            }

            let exists = match overlay.get(id) {
                Some(exists) => *exists,
                None => self.entries.contains_key(id)?,
            };
            match change {
                IndexChange::Add(_) if exists => return Err(Error::AlreadyExists(id.to_string())),
                IndexChange::Update(_) | IndexChange::Remove(_) if !exists => {
                    return Err(Error::NotFound(id.to_string()))
                }
                _ => {}
            }
            overlay.insert(id, !matches!(change, IndexChange::Remove(_)));
        }
        Ok(())
    }

    fn insert_tx(
        entries: &TransactionalTree,
        children: &TransactionalTree,
        types: &TransactionalTree,
        entry: &ContentEntry,
        bytes: &[u8],
    ) -> TxResult<()> {
        entries.insert(entry.id.as_bytes(), bytes)?;
        if let Some(parent) = &entry.parent_id {
            children.insert(index_key(parent, &entry.id), &[])?;
        }
        types.insert(index_key(&entry.type_id, &entry.id), &[])?;
        Ok(())
    }

    /// Remove an entry and its index keys. Returns whether it existed.
    fn remove_tx(
        entries: &TransactionalTree,
        children: &TransactionalTree,
        types: &TransactionalTree,
        id: &str,
    ) -> TxResult<bool> {
        let Some(bytes) = entries.remove(id.as_bytes())? else {
            return Ok(false);
        };
        let old = ContentEntry::from_bytes(&bytes)
            .map_err(|e| ConflictableTransactionError::Abort(Error::from(e)))?;
        if let Some(parent) = &old.parent_id {
            children.remove(index_key(parent, id))?;
        }
        types.remove(index_key(&old.type_id, id))?;
        Ok(true)
    }
}

impl ContentStore for SledContentStore {
    fn get_entry(&self, id: &str) -> Result<Option<ContentEntry>, Error> {
        self.load(id.as_bytes())
    }

    fn children(&self, parent_id: &str) -> Result<Vec<ContentEntry>, Error> {
        let mut out = self.load_indexed(&self.children, &index_prefix(parent_id))?;
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn unfiled(&self) -> Result<Vec<ContentEntry>, Error> {
        let mut out = Vec::new();
        for item in self.entries.iter() {
            let (_, bytes) = item?;
            let entry = ContentEntry::from_bytes(&bytes)?;
            if entry.is_unfiled() {
                out.push(entry);
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    #[instrument(skip(self, changes), fields(changes = changes.len()))]
    fn apply(&self, changes: &[IndexChange]) -> Result<IndexSummary, Error> {
        let _writer = self.writer.lock();
        self.validate(changes)?;

        let encoded: Vec<Option<Vec<u8>>> = changes
            .iter()
            .map(|change| match change {
                IndexChange::Add(entry) | IndexChange::Update(entry) => {
                    entry.to_bytes().map(Some)
                }
                IndexChange::Remove(_) => Ok(None),
            })
            .collect::<Result<_, _>>()?;

        let result: Result<(), TransactionError<Error>> = (
            &self.entries,
            &self.children,
            &self.types,
        )
            .transaction(|(entries, children, types)| {
                for (change, bytes) in changes.iter().zip(&encoded) {
                    match (change, bytes) {
                        (IndexChange::Add(entry), Some(bytes)) => {
                            Self::insert_tx(entries, children, types, entry, bytes)?;
                        }
                        (IndexChange::Update(entry), Some(bytes)) => {
                            Self::remove_tx(entries, children, types, &entry.id)?;
                            Self::insert_tx(entries, children, types, entry, bytes)?;
                        }
                        (IndexChange::Remove(id), _) => {
                            Self::remove_tx(entries, children, types, id)?;
                        }
                        _ => {
                            return Err(ConflictableTransactionError::Abort(Error::InvalidData(
                                "missing encoded entry".to_string(),
                            )))
                        }
                    }
                }
                Ok(())
            });

        match result {
            Ok(()) => {
                let summary = IndexSummary::applied(changes);
                debug!(
                    added = summary.added,
                    updated = summary.updated,
                    removed = summary.removed,
                    "Applied index batch"
                );
                Ok(summary)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    fn select(&self, selector: &Selector) -> Result<Vec<ContentEntry>, Error> {
        let type_ids: BTreeSet<&str> = selector.type_ids.iter().map(String::as_str).collect();

        let mut out = Vec::new();
        for type_id in type_ids {
            for entry in self.load_indexed(&self.types, &index_prefix(type_id))? {
                if FilterEvaluator::matches_opt(selector.predicate.as_ref(), &entry) {
                    out.push(entry);
                }
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}

/// `owner` NUL `id`.
/// Ids and owners are joined with NUL in index keys.
fn check_key_part(what: &str, value: &str) -> Result<(), Error> {
    if value.as_bytes().contains(&0) {
        return Err(Error::InvalidData(format!("{what} '{value}' contains NUL")));
    }
    Ok(())
}

fn index_key(owner: &str, id: &str) -> Vec<u8> {
    let mut key = index_prefix(owner);
    key.extend_from_slice(id.as_bytes());
    key
}

fn index_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 1);
    prefix.extend_from_slice(owner.as_bytes());
    prefix.push(0); // Null separator
    prefix
}
