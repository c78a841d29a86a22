use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use bson::Document;
use crate::error::{Error, Result};
use crate::event;
use crate::obs::logger::{LoggerAndTracer, NoOpLogger};
use crate::obs::metrics::StoreMetrics;
use crate::options::PathConflictPolicy;
use crate::query::execution::apply_update_atomically;
use crate::query::update::UpdateExpr;
use crate::query::Filter;
use crate::storage::DocumentStore;

/// An in-process collection keeping its documents in insertion order.
pub struct MemoryStore {
    name: String,
    documents: RwLock<Vec<Document>>,
    policy: PathConflictPolicy,
    metrics: StoreMetrics,
    logger: Arc<dyn LoggerAndTracer>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(
            name,
            PathConflictPolicy::default(),
            StoreMetrics::new(),
            Arc::new(NoOpLogger),
        )
    }

    pub(crate) fn with_settings(
        name: impl Into<String>,
        policy: PathConflictPolicy,
        metrics: StoreMetrics,
        logger: Arc<dyn LoggerAndTracer>,
    ) -> Self {
        MemoryStore {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
            policy,
            metrics,
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `document`, calling `before_commit` with its slot first. The document is
    /// not stored if `before_commit` fails.
    pub(crate) fn insert_with<F>(&self, document: Document, before_commit: F) -> Result<()>
    where
        F: FnOnce(u64, &Document) -> Result<()>,
    {
        let mut documents = self.write()?;
        let slot = documents.len() as u64;
        before_commit(slot, &document)?;
        documents.push(document);
        self.metrics.inserted.inc();
        event!(self.logger, "insert committed, collection={}, slot={}", self.name, slot);
        Ok(())
    }

    /// Applies `update` to the first document matching `filter`, calling `before_commit`
    /// with the slot and the updated document before it replaces the stored one.
    pub(crate) fn update_with<F>(&self, filter: &Filter, update: &UpdateExpr, before_commit: F) -> Result<()>
    where
        F: FnOnce(u64, &Document) -> Result<()>,
    {
        update.validate()?;
        let mut documents = self.write()?;

        let slot = match documents.iter().position(|doc| filter.matches(doc)) {
            Some(slot) => slot,
            None => {
                self.metrics.unmatched.inc();
                event!(self.logger, "update unmatched, collection={}", self.name);
                return Ok(());
            }
        };

        let updated = apply_update_atomically(&documents[slot], update, self.policy)?;
        before_commit(slot as u64, &updated)?;
        documents[slot] = updated;
        self.metrics.updated.inc();
        event!(self.logger, "update committed, collection={}, slot={}", self.name, slot);
        Ok(())
    }

    /// Stores `document` at `slot`, replacing the document already there or appending it
    /// when `slot` is the next free one. Used to rebuild a collection from the log.
    pub(crate) fn put(&self, slot: u64, document: Document) -> Result<()> {
        let mut documents = self.write()?;
        let len = documents.len() as u64;
        if slot < len {
            documents[slot as usize] = document;
        } else if slot == len {
            documents.push(document);
        } else {
            return Err(Error::UnexpectedError(format!(
                "Cannot put document at slot {} of collection {} holding {} documents",
                slot, self.name, len
            )));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>> {
        self.documents
            .read()
            .map_err(|_| Error::UnexpectedError(format!("Collection {} lock poisoned", self.name)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>> {
        self.documents
            .write()
            .map_err(|_| Error::UnexpectedError(format!("Collection {} lock poisoned", self.name)))
    }
}

impl DocumentStore for MemoryStore {
    fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        let documents = self.read()?;
        Ok(documents.iter().find(|doc| filter.matches(doc)).cloned())
    }

    fn insert_one(&self, document: Document) -> Result<()> {
        self.insert_with(document, |_, _| Ok(()))
    }

    fn update_one(&self, filter: &Filter, update: &UpdateExpr) -> Result<()> {
        self.update_with(filter, update, |_, _| Ok(()))
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
