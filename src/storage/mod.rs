use bson::Document;
use crate::error::Result;
use crate::query::update::UpdateExpr;
use crate::query::Filter;

pub mod append_log;
pub mod log_store;
pub mod memory_store;
pub mod wal;

pub use log_store::LogStore;
pub use memory_store::MemoryStore;

/// The operations a collection backend must provide.
///
/// Implementations serialise mutations per collection: `update_one` finds, mutates and
/// commits the matching document without letting another writer interleave.
pub trait DocumentStore: Send + Sync {
    /// Returns a copy of the first document, in insertion order, matching `filter`.
    fn find_one(&self, filter: &Filter) -> Result<Option<Document>>;

    /// Appends `document` to the collection. No uniqueness constraint is enforced.
    fn insert_one(&self, document: Document) -> Result<()>;

    /// Applies `update` to the first document matching `filter`. Updating a collection
    /// without any match is a no-op.
    fn update_one(&self, filter: &Filter, update: &UpdateExpr) -> Result<()>;

    /// Returns the number of documents in the collection.
    fn count(&self) -> Result<usize>;
}
