use std::sync::Arc;
use bson::Document;
use crate::error::Result;
use crate::query::parser::{parse_filter, parse_update};
use crate::query::update::UpdateExpr;
use crate::storage::DocumentStore;

/// A handle on a named collection, accepting MongoDB style filter and update documents.
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: Arc<dyn DocumentStore>,
}

impl Collection {
    pub fn new(name: impl Into<String>, store: Arc<dyn DocumentStore>) -> Collection {
        Collection { name: name.into(), store }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first document, in insertion order, whose fields equal those of `filter`.
    pub fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        self.store.find_one(&parse_filter(&filter)?)
    }

    pub fn insert_one(&self, document: Document) -> Result<()> {
        self.store.insert_one(document)
    }

    pub fn insert_many(&self, documents: Vec<Document>) -> Result<()> {
        for document in documents {
            self.store.insert_one(document)?;
        }
        Ok(())
    }

    /// Applies an update document such as `{ "$inc": { "login_count": 1 } }` to the first
    /// matching document. Nothing happens if no document matches.
    pub fn update_one(&self, filter: Document, update: Document) -> Result<()> {
        let update = parse_update(&update)?;
        self.update_one_with(filter, &update)
    }

    pub fn update_one_with(&self, filter: Document, update: &UpdateExpr) -> Result<()> {
        self.store.update_one(&parse_filter(&filter)?, update)
    }

    pub fn count(&self) -> Result<usize> {
        self.store.count()
    }
}
