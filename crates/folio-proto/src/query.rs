//! Query model types: parsed queries, predicates and storage selectors.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::PagingParams;
use crate::value::Value;

/// The declared dialect of a submitted statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    /// CMIS query language (`CMISQL`).
    CmisSql,
    /// Any other dialect tag; only understood by custom parsers.
    Other(String),
}

impl StatementType {
    /// The tag as submitted by callers.
    pub fn as_str(&self) -> &str {
        match self {
            StatementType::CmisSql => "CMISQL",
            StatementType::Other(tag) => tag,
        }
    }
}

impl From<&str> for StatementType {
    fn from(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("CMISQL") || tag.eq_ignore_ascii_case("cmis-sql") {
            StatementType::CmisSql
        } else {
            StatementType::Other(tag.to_string())
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean condition over entry properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// `property op value`.
    Compare {
        property: String,
        op: CompareOp,
        value: Value,
    },
    /// `property [NOT] IN (values)`.
    In {
        property: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `property [NOT] LIKE 'pattern'` with `%` and `_` wildcards.
    Like {
        property: String,
        pattern: String,
        negated: bool,
    },
    /// `property IS [NOT] NULL`.
    IsNull { property: String, negated: bool },
    /// `IN_FOLDER('folder-id')`: direct children of a folder.
    InFolder(String),
    /// Logical AND.
    And(Vec<Predicate>),
    /// Logical OR.
    Or(Vec<Predicate>),
    /// Logical NOT.
    Not(Box<Predicate>),
}

impl Predicate {
    /// `property = value`.
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Eq, value)
    }

    /// `property op value`.
    pub fn compare(property: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// `property LIKE pattern`.
    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            property: property.into(),
            pattern: pattern.into(),
            negated: false,
        }
    }

    /// `IN_FOLDER(folder_id)`.
    pub fn in_folder(folder_id: impl Into<String>) -> Self {
        Predicate::InFolder(folder_id.into())
    }

    /// Conjoin two predicates, flattening nested ANDs.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Predicate::And(inner) => parts.extend(inner),
                p => parts.push(p),
            }
        }
        Predicate::And(parts)
    }

    /// Property ids referenced by this predicate.
    ///
    /// `IN_FOLDER` references `cmis:parentId`.
    pub fn referenced_properties(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Compare { property, .. }
            | Predicate::In { property, .. }
            | Predicate::Like { property, .. }
            | Predicate::IsNull { property, .. } => {
                out.insert(property);
            }
            Predicate::InFolder(_) => {
                out.insert(crate::entry::properties::PARENT_ID);
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for p in parts {
                    p.collect_properties(out);
                }
            }
            Predicate::Not(inner) => inner.collect_properties(out),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// An ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub property: String,
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// The select list of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// `SELECT *`: every property of the source type.
    All,
    /// An explicit property list, in output order.
    Properties(Vec<String>),
}

/// A parsed, not yet planned query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    /// Source object type id (the `FROM` clause).
    pub source: String,
    pub projection: Projection,
    pub predicate: Option<Predicate>,
    pub order_by: Vec<OrderSpec>,
    /// Paging applied to the result set.
    pub paging: PagingParams,
}

impl QueryModel {
    /// `SELECT * FROM source`.
    pub fn select_all(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            projection: Projection::All,
            predicate: None,
            order_by: Vec::new(),
            paging: PagingParams::default(),
        }
    }

    /// Select an explicit property list.
    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Projection::Properties(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Set the `WHERE` predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Add an ordering key.
    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    /// Set result paging.
    pub fn with_paging(mut self, paging: PagingParams) -> Self {
        self.paging = paging;
        self
    }
}

/// A single-source selector resolved against storage-level type ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    /// Concrete object type ids to scan.
    pub type_ids: Vec<String>,
    /// Optional filter evaluated by the store.
    pub predicate: Option<Predicate>,
}

impl Selector {
    /// Select every entry of the given type ids.
    pub fn types<I, S>(type_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_ids: type_ids.into_iter().map(Into::into).collect(),
            predicate: None,
        }
    }

    /// Restrict the selection with a predicate, conjoining with any existing one.
    pub fn filtered(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}
