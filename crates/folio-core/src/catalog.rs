//! Object type catalog.
//!
//! Queries name an object type in their `FROM` clause and properties in
//! their select list, predicate and ordering. The catalog tells the parser
//! which types exist and the planner which properties a type has and how
//! they may be used.

use std::collections::BTreeMap;

use folio_proto::{properties, BaseType};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Data type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Boolean,
    Integer,
    Decimal,
    String,
    DateTime,
    Id,
}

/// A property definition within an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property id, e.g. `cmis:name`.
    pub id: String,
    pub property_type: PropertyType,
    /// Whether the property may appear in a `WHERE` clause.
    pub queryable: bool,
    /// Whether the property may appear in an `ORDER BY` clause.
    pub orderable: bool,
}

impl PropertyDef {
    /// A queryable, orderable property.
    pub fn new(id: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            id: id.into(),
            property_type,
            queryable: true,
            orderable: true,
        }
    }

    /// Mark the property as not usable in predicates.
    pub fn not_queryable(mut self) -> Self {
        self.queryable = false;
        self
    }

    /// Mark the property as not usable for ordering.
    pub fn not_orderable(mut self) -> Self {
        self.orderable = false;
        self
    }
}

/// An object type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type id, e.g. `cmis:document` or `acme:invoice`.
    pub id: String,
    pub base: BaseType,
    /// Parent type id. `None` for base types.
    pub parent: Option<String>,
    /// Properties declared by this type, not including inherited ones.
    pub properties: Vec<PropertyDef>,
}

impl TypeDef {
    /// Create a type with no properties.
    pub fn new(id: impl Into<String>, base: BaseType) -> Self {
        Self {
            id: id.into(),
            base,
            parent: None,
            properties: Vec::new(),
        }
    }

    /// Create a subtype of `parent`.
    pub fn subtype(id: impl Into<String>, parent: &TypeDef) -> Self {
        Self {
            parent: Some(parent.id.clone()),
            ..Self::new(id, parent.base)
        }
    }

    /// Declare a property.
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }
}

/// Registry of object types.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: BTreeMap<String, TypeDef>,
}

impl TypeCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with the `cmis:document` and `cmis:folder` base types.
    pub fn cmis() -> Self {
        let common = || {
            vec![
                PropertyDef::new(properties::OBJECT_ID, PropertyType::Id),
                PropertyDef::new(properties::NAME, PropertyType::String),
                PropertyDef::new(properties::OBJECT_TYPE_ID, PropertyType::Id),
                PropertyDef::new(properties::BASE_TYPE_ID, PropertyType::Id).not_orderable(),
                PropertyDef::new(properties::CREATED_BY, PropertyType::String),
                PropertyDef::new(properties::CREATION_DATE, PropertyType::DateTime),
                PropertyDef::new(properties::LAST_MODIFICATION_DATE, PropertyType::DateTime),
            ]
        };

        let mut document = TypeDef::new(BaseType::Document.type_id(), BaseType::Document);
        document.properties = common();
        document.properties.push(PropertyDef::new(
            properties::CONTENT_STREAM_LENGTH,
            PropertyType::Integer,
        ));

        let mut folder = TypeDef::new(BaseType::Folder.type_id(), BaseType::Folder);
        folder.properties = common();
        folder
            .properties
            .push(PropertyDef::new(properties::PARENT_ID, PropertyType::Id).not_orderable());

        Self::new().with_type(document).with_type(folder)
    }

    /// Add or replace a type without validation.
    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.insert(def.id.clone(), def);
        self
    }

    /// Register a new type.
    ///
    /// Fails if the id is taken or the parent type is unknown.
    pub fn register(&mut self, def: TypeDef) -> Result<(), Error> {
        if self.types.contains_key(&def.id) {
            return Err(Error::AlreadyExists(def.id));
        }
        if let Some(parent) = &def.parent {
            if !self.types.contains_key(parent) {
                return Err(Error::NotFound(parent.clone()));
            }
        }
        self.types.insert(def.id.clone(), def);
        Ok(())
    }

    pub fn get(&self, type_id: &str) -> Option<&TypeDef> {
        self.types.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// All type ids, sorted.
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Look up a property on a type or any of its ancestors.
    pub fn property(&self, type_id: &str, property_id: &str) -> Option<&PropertyDef> {
        self.lineage(type_id)
            .into_iter()
            .find_map(|def| def.properties.iter().find(|p| p.id == property_id))
    }

    /// Every property of a type, inherited ones first.
    pub fn properties(&self, type_id: &str) -> Vec<&PropertyDef> {
        let mut out: Vec<&PropertyDef> = Vec::new();
        for def in self.lineage(type_id).into_iter().rev() {
            for property in &def.properties {
                if !out.iter().any(|p| p.id == property.id) {
                    out.push(property);
                }
            }
        }
        out
    }

    /// The type id followed by the ids of all its subtypes.
    ///
    /// Empty when the type is unknown.
    pub fn descendants(&self, type_id: &str) -> Vec<String> {
        if !self.contains(type_id) {
            return Vec::new();
        }

        let mut out = vec![type_id.to_string()];
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor].clone();
            for def in self.types.values() {
                if def.parent.as_deref() == Some(current.as_str()) && !out.contains(&def.id) {
                    out.push(def.id.clone());
                }
            }
            cursor += 1;
        }
        out
    }

    /// The type and its ancestors, nearest first.
    fn lineage(&self, type_id: &str) -> Vec<&TypeDef> {
        let mut out = Vec::new();
        let mut current = self.types.get(type_id);
        while let Some(def) = current {
            if out.len() > self.types.len() {
                break;
            }
            out.push(def);
            current = def.parent.as_deref().and_then(|p| self.types.get(p));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_invoice() -> TypeCatalog {
        let mut catalog = TypeCatalog::cmis();
        let document = catalog.get("cmis:document").cloned().unwrap();
        let invoice = TypeDef::subtype("acme:invoice", &document)
            .with_property(PropertyDef::new("acme:amount", PropertyType::Decimal))
            .with_property(PropertyDef::new("acme:scan", PropertyType::String).not_queryable());
        catalog.register(invoice.clone()).unwrap();
        catalog
            .register(TypeDef::subtype("acme:credit_note", &invoice))
            .unwrap();
        catalog
    }

    #[test]
    fn test_cmis_base_types() {
        let catalog = TypeCatalog::cmis();
        assert!(catalog.contains("cmis:document"));
        assert!(catalog.contains("cmis:folder"));
        assert!(catalog.property("cmis:folder", properties::PARENT_ID).is_some());
        assert!(catalog
            .property("cmis:document", properties::CONTENT_STREAM_LENGTH)
            .is_some());
        assert!(catalog.property("cmis:document", properties::PARENT_ID).is_none());
    }

    #[test]
    fn test_inherited_properties() {
        let catalog = catalog_with_invoice();

        let amount = catalog.property("acme:credit_note", "acme:amount").unwrap();
        assert_eq!(amount.property_type, PropertyType::Decimal);
        assert!(catalog.property("acme:credit_note", properties::NAME).is_some());

        let ids: Vec<&str> = catalog
            .properties("acme:invoice")
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids.first(), Some(&properties::OBJECT_ID));
        assert_eq!(ids.last(), Some(&"acme:scan"));
    }

    #[test]
    fn test_descendants() {
        let catalog = catalog_with_invoice();
        assert_eq!(
            catalog.descendants("cmis:document"),
            vec!["cmis:document", "acme:invoice", "acme:credit_note"]
        );
        assert_eq!(catalog.descendants("cmis:folder"), vec!["cmis:folder"]);
        assert!(catalog.descendants("acme:missing").is_empty());
    }

    #[test]
    fn test_register_validation() {
        let mut catalog = TypeCatalog::cmis();
        assert!(matches!(
            catalog.register(TypeDef::new("cmis:folder", BaseType::Folder)),
            Err(Error::AlreadyExists(_))
        ));

        let mut orphan = TypeDef::new("acme:orphan", BaseType::Document);
        orphan.parent = Some("acme:nope".into());
        assert!(matches!(catalog.register(orphan), Err(Error::NotFound(_))));
    }
}
