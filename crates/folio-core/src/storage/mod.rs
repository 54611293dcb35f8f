//! Storage layer for Folio.
//!
//! Entries are kept in sled with two secondary indexes, one by parent folder
//! and one by object type. Index batches are applied in a single sled
//! transaction.

mod config;
mod engine;
mod store;

pub use config::StorageConfig;
pub use engine::SledContentStore;
pub use store::ContentStore;
