use std::sync::{Arc, Mutex};
use bson::Document;
use crate::error::{Error, Result};
use crate::query::update::UpdateExpr;
use crate::query::Filter;
use crate::storage::memory_store::MemoryStore;
use crate::storage::wal::{PutRecord, WriteAheadLog};
use crate::storage::DocumentStore;

/// A durable collection: a [`MemoryStore`] whose changes are written to the write-ahead
/// log before they become visible.
pub struct LogStore {
    memory: Arc<MemoryStore>,
    wal: Arc<Mutex<WriteAheadLog>>,
}

impl LogStore {
    pub(crate) fn new(memory: Arc<MemoryStore>, wal: Arc<Mutex<WriteAheadLog>>) -> Self {
        LogStore { memory, wal }
    }

    fn log_put(&self, slot: u64, document: &Document) -> Result<()> {
        let record = PutRecord {
            collection: self.memory.name().to_string(),
            slot,
            document: document.clone(),
        };
        let mut wal = self
            .wal
            .lock()
            .map_err(|_| Error::UnexpectedError("WAL lock poisoned".to_string()))?;
        wal.append(&record)
    }
}

impl DocumentStore for LogStore {
    fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        self.memory.find_one(filter)
    }

    fn insert_one(&self, document: Document) -> Result<()> {
        self.memory.insert_with(document, |slot, doc| self.log_put(slot, doc))
    }

    fn update_one(&self, filter: &Filter, update: &UpdateExpr) -> Result<()> {
        self.memory.update_with(filter, update, |slot, doc| self.log_put(slot, doc))
    }

    fn count(&self) -> Result<usize> {
        self.memory.count()
    }
}
