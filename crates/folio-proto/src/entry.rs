//! Content entries and paging.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::Value;

/// Well-known property ids exposed for every entry.
pub mod properties {
    pub const OBJECT_ID: &str = "cmis:objectId";
    pub const NAME: &str = "cmis:name";
    pub const OBJECT_TYPE_ID: &str = "cmis:objectTypeId";
    pub const BASE_TYPE_ID: &str = "cmis:baseTypeId";
    pub const PARENT_ID: &str = "cmis:parentId";
    pub const CREATED_BY: &str = "cmis:createdBy";
    pub const CREATION_DATE: &str = "cmis:creationDate";
    pub const LAST_MODIFICATION_DATE: &str = "cmis:lastModificationDate";
    pub const CONTENT_STREAM_LENGTH: &str = "cmis:contentStreamLength";
}

/// The base type every repository object derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Document,
    Folder,
    Policy,
    Relationship,
    Item,
}

impl BaseType {
    /// The base type id as it appears in `cmis:baseTypeId`.
    pub fn type_id(self) -> &'static str {
        match self {
            BaseType::Document => "cmis:document",
            BaseType::Folder => "cmis:folder",
            BaseType::Policy => "cmis:policy",
            BaseType::Relationship => "cmis:relationship",
            BaseType::Item => "cmis:item",
        }
    }

    /// Whether objects of this base type can be filed in folders.
    pub fn is_fileable(self) -> bool {
        matches!(self, BaseType::Document | BaseType::Folder | BaseType::Item)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id())
    }
}

impl FromStr for BaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmis:document" => Ok(BaseType::Document),
            "cmis:folder" => Ok(BaseType::Folder),
            "cmis:policy" => Ok(BaseType::Policy),
            "cmis:relationship" => Ok(BaseType::Relationship),
            "cmis:item" => Ok(BaseType::Item),
            other => Err(Error::InvalidValue {
                kind: "base type",
                value: other.to_string(),
            }),
        }
    }
}

/// A content entry as seen by the query subsystem.
///
/// System properties (`cmis:objectId`, `cmis:name`, ...) are derived from the
/// struct fields; everything else lives in `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub name: String,
    pub base_type: BaseType,
    /// Concrete object type id, e.g. `cmis:document` or `acme:invoice`.
    pub type_id: String,
    /// Parent folder id. `None` for the root folder and for unfiled objects.
    pub parent_id: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl ContentEntry {
    /// Create a document entry of the base document type.
    pub fn document(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, BaseType::Document)
    }

    /// Create a folder entry of the base folder type.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, BaseType::Folder)
    }

    /// Create an entry of the given base type.
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_type: BaseType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_type,
            type_id: base_type.type_id().to_string(),
            parent_id: None,
            properties: BTreeMap::new(),
        }
    }

    /// Set a concrete object type.
    pub fn with_type(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = type_id.into();
        self
    }

    /// File the entry into a parent folder.
    pub fn in_folder(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set a custom property.
    pub fn with_property(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(id.into(), value.into());
        self
    }

    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.base_type == BaseType::Folder
    }

    /// Whether this entry is fileable but not filed anywhere.
    ///
    /// Folders are never unfiled: a parentless folder is a root.
    pub fn is_unfiled(&self) -> bool {
        self.parent_id.is_none() && self.base_type.is_fileable() && !self.is_folder()
    }

    /// Look up a property, including the derived system properties.
    ///
    /// Returns `None` when the property is not set at all.
    pub fn property(&self, id: &str) -> Option<Value> {
        match id {
            properties::OBJECT_ID => Some(Value::String(self.id.clone())),
            properties::NAME => Some(Value::String(self.name.clone())),
            properties::OBJECT_TYPE_ID => Some(Value::String(self.type_id.clone())),
            properties::BASE_TYPE_ID => Some(Value::String(self.base_type.type_id().into())),
            properties::PARENT_ID => Some(Value::from(self.parent_id.clone())),
            other => self.properties.get(other).cloned(),
        }
    }

    /// Serialize to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Paging parameters for listing operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingParams {
    /// Maximum number of items to return. `None` means the repository default.
    pub max_items: Option<usize>,
    /// Number of items to skip.
    pub skip_count: usize,
}

impl PagingParams {
    /// Paging with a page size and no offset.
    pub fn max_items(max_items: usize) -> Self {
        Self {
            max_items: Some(max_items),
            skip_count: 0,
        }
    }

    /// Set the number of items to skip.
    pub fn skip(mut self, skip_count: usize) -> Self {
        self.skip_count = skip_count;
        self
    }

    /// Apply this paging to an ordered list, using `default_max` when no
    /// page size was requested and never exceeding `limit_max`.
    pub fn apply<T>(&self, items: Vec<T>, default_max: usize, limit_max: usize) -> Page<T> {
        let total = items.len();
        let max = self.max_items.unwrap_or(default_max).min(limit_max);
        let items: Vec<T> = items.into_iter().skip(self.skip_count).take(max).collect();
        let has_more_items = self.skip_count.saturating_add(items.len()) < total;

        Page {
            items,
            has_more_items,
            num_items: total,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Whether more items exist past this page.
    pub has_more_items: bool,
    /// Total number of items across all pages.
    pub num_items: usize,
}

/// A page of content entries.
pub type EntryPage = Page<ContentEntry>;

impl<T> Page<T> {
    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_properties() {
        let entry = ContentEntry::document("doc-1", "report.pdf")
            .in_folder("root")
            .with_property(properties::CONTENT_STREAM_LENGTH, 1024i64);

        assert_eq!(entry.property(properties::OBJECT_ID), Some("doc-1".into()));
        assert_eq!(entry.property(properties::NAME), Some("report.pdf".into()));
        assert_eq!(
            entry.property(properties::BASE_TYPE_ID),
            Some("cmis:document".into())
        );
        assert_eq!(entry.property(properties::PARENT_ID), Some("root".into()));
        assert_eq!(
            entry.property(properties::CONTENT_STREAM_LENGTH),
            Some(Value::Integer(1024))
        );
        assert_eq!(entry.property("acme:missing"), None);
    }

    #[test]
    fn test_unfiled() {
        assert!(ContentEntry::document("d", "d").is_unfiled());
        assert!(!ContentEntry::document("d", "d").in_folder("f").is_unfiled());
        assert!(!ContentEntry::folder("root", "root").is_unfiled());
        assert!(!ContentEntry::new("p", "p", BaseType::Policy).is_unfiled());
    }

    #[test]
    fn test_paging() {
        let items: Vec<u32> = (0..10).collect();

        let page = PagingParams::max_items(3).skip(2).apply(items.clone(), 100, 100);
        assert_eq!(page.items, vec![2, 3, 4]);
        assert!(page.has_more_items);
        assert_eq!(page.num_items, 10);

        let last = PagingParams::max_items(5).skip(8).apply(items.clone(), 100, 100);
        assert_eq!(last.items, vec![8, 9]);
        assert!(!last.has_more_items);

        let clamped = PagingParams::default().apply(items, 4, 2);
        assert_eq!(clamped.len(), 2);
    }

    #[test]
    fn test_entry_bytes() {
        let entry = ContentEntry::folder("f1", "Projects").in_folder("root");
        let decoded = ContentEntry::from_bytes(&entry.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert!(ContentEntry::from_bytes(b"not json").is_err());
    }

    #[test]
    fn test_base_type_parse() {
        assert_eq!("cmis:folder".parse::<BaseType>().unwrap(), BaseType::Folder);
        assert!("cmis:nope".parse::<BaseType>().is_err());
    }
}
