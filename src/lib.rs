pub mod collection;
pub mod error;
pub mod learning;
pub mod obs;
pub mod options;
pub mod query;
pub mod storage;
mod util;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::obs::logger::{LoggerAndTracer, NoOpLogger};
use crate::obs::metrics::{MetricRegistry, StoreMetrics};
use crate::options::Options;
use crate::storage::wal::WriteAheadLog;
use crate::storage::{DocumentStore, LogStore, MemoryStore};

/// An embedded document database.
///
/// A database opened on a directory journals every change to a write-ahead log and
/// rebuilds its collections from it on open. An in-memory database keeps nothing once
/// dropped.
pub struct TutorDB {
    options: Arc<Options>,
    db_impl: Arc<DbImpl>,
}

impl TutorDB {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    pub fn open_with_options(path: &Path, options: Options) -> Result<Self> {
        Self::open_with(path, options, Arc::new(NoOpLogger))
    }

    pub fn open_with_logger(path: &Path, logger: Arc<dyn LoggerAndTracer>) -> Result<Self> {
        Self::open_with(path, Options::default(), logger)
    }

    pub fn open_with(path: &Path, options: Options, logger: Arc<dyn LoggerAndTracer>) -> Result<Self> {
        let options = Arc::new(options);
        let metrics = StoreMetrics::new();
        let (wal, records) =
            WriteAheadLog::open(logger.clone(), metrics.clone(), path, options.wal_bytes_per_sync())?;

        let db_impl = Arc::new(DbImpl::new(
            options.clone(),
            logger.clone(),
            metrics,
            Some(Arc::new(Mutex::new(wal))),
        ));

        for record in records {
            db_impl.memory_store(&record.collection).put(record.slot, record.document)?;
        }
        crate::info!(logger, "Database opened at {:?}, collections={}", path, db_impl.collection_names().len());

        Ok(TutorDB { options, db_impl })
    }

    pub fn in_memory() -> Self {
        Self::in_memory_with_options(Options::default())
    }

    pub fn in_memory_with_options(options: Options) -> Self {
        Self::in_memory_with(options, Arc::new(NoOpLogger))
    }

    pub fn in_memory_with(options: Options, logger: Arc<dyn LoggerAndTracer>) -> Self {
        let options = Arc::new(options);
        let db_impl = Arc::new(DbImpl::new(options.clone(), logger, StoreMetrics::new(), None));
        TutorDB { options, db_impl }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The logger shared by the storage layer and the services built on this database.
    pub fn logger(&self) -> Arc<dyn LoggerAndTracer> {
        self.db_impl.logger.clone()
    }

    /// Returns the collection with the given name, creating it if it does not exist.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(name, self.db_impl.store(name))
    }

    pub fn list_collections(&self) -> Vec<String> {
        self.db_impl.collection_names()
    }

    /// Returns the current value of the database counters.
    pub fn metrics(&self) -> BTreeMap<String, u64> {
        self.db_impl.metric_registry.snapshot()
    }

    /// Forces the pending log bytes to disk.
    pub fn sync(&self) -> Result<()> {
        match &self.db_impl.wal {
            Some(wal) => wal
                .lock()
                .map_err(|_| Error::UnexpectedError("WAL lock poisoned".to_string()))?
                .sync(),
            None => Ok(()),
        }
    }
}

struct DbImpl {
    options: Arc<Options>,
    logger: Arc<dyn LoggerAndTracer>,
    metrics: StoreMetrics,
    metric_registry: MetricRegistry,
    collections: RwLock<BTreeMap<String, Arc<MemoryStore>>>,
    wal: Option<Arc<Mutex<WriteAheadLog>>>,
}

impl DbImpl {
    fn new(
        options: Arc<Options>,
        logger: Arc<dyn LoggerAndTracer>,
        metrics: StoreMetrics,
        wal: Option<Arc<Mutex<WriteAheadLog>>>,
    ) -> Self {
        let mut metric_registry = MetricRegistry::new();
        metrics.register_to(&mut metric_registry);
        DbImpl {
            options,
            logger,
            metrics,
            metric_registry,
            collections: RwLock::new(BTreeMap::new()),
            wal,
        }
    }

    fn memory_store(&self, name: &str) -> Arc<MemoryStore> {
        if let Some(store) = self.collections.read().unwrap_or_else(PoisonError::into_inner).get(name) {
            return store.clone();
        }
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                crate::debug!(self.logger, "Creating collection {}", name);
                Arc::new(MemoryStore::with_settings(
                    name,
                    self.options.path_conflict_policy(),
                    self.metrics.clone(),
                    self.logger.clone(),
                ))
            })
            .clone()
    }

    fn store(&self, name: &str) -> Arc<dyn DocumentStore> {
        let memory = self.memory_store(name);
        let store: Arc<dyn DocumentStore> = match &self.wal {
            Some(wal) => Arc::new(LogStore::new(memory, wal.clone())),
            None => memory,
        };
        store
    }

    fn collection_names(&self) -> Vec<String> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
