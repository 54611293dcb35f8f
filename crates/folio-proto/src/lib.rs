//! Folio model types.
//!
//! This crate defines the values passed across the Folio query pipeline:
//! repository commands, content entries, index change sets, parsed query
//! models, storage selectors and result sets.
//!
//! # Modules
//!
//! - [`value`] - Property values
//! - [`entry`] - Content entries and paging
//! - [`index`] - Index change sets
//! - [`query`] - Query models, predicates and selectors
//! - [`result`] - Result sets
//! - [`command`] - Repository commands
//! - [`error`] - Model error types

pub mod command;
pub mod entry;
pub mod error;
pub mod index;
pub mod query;
pub mod result;
pub mod value;

pub use command::{
    Command, CommandKind, ExecuteSelector, ModifyIndex, ParseStatement, ProcessQuery,
    ReadChildEntries, ReadContentEntry, ReadUnfiledEntries, SubmitStatement,
};
pub use entry::{properties, BaseType, ContentEntry, EntryPage, Page, PagingParams};
pub use error::Error;
pub use index::{IndexChange, IndexSummary};
pub use query::{
    CompareOp, OrderSpec, Predicate, Projection, QueryModel, Selector, SortDirection,
    StatementType,
};
pub use result::{ResultSet, Row};
pub use value::Value;
