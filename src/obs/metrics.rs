use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const DOCUMENTS_INSERTED: &str = "documents_inserted";
pub const DOCUMENTS_UPDATED: &str = "documents_updated";
pub const UPDATES_UNMATCHED: &str = "updates_unmatched";
pub const WAL_BYTES_WRITTEN: &str = "wal_bytes_written";

#[derive(Default, Clone)]
pub struct MetricRegistry {
    counters: BTreeMap<String, Arc<Counter>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_counter(&mut self, name: &str, counter: Arc<Counter>) -> &mut Self {
        self.counters.insert(name.to_string(), counter);
        self
    }

    pub fn get_counter(&self, name: &str) -> Option<Arc<Counter>> {
        self.counters.get(name).cloned()
    }

    /// Returns the current value of every registered counter.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|(name, counter)| (name.clone(), counter.get()))
            .collect()
    }
}

#[derive(Default)]
pub struct Counter {
    atomic: AtomicU64,
}

impl Counter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the current value of the counter.
    pub fn get(&self) -> u64 {
        self.atomic.load(Ordering::Relaxed)
    }

    /// Increments the counter by one.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increments the counter by the given amount.
    pub fn inc_by(&self, amount: u64) {
        self.atomic.fetch_add(amount, Ordering::Relaxed);
    }
}

/// The counters shared by the stores of a database.
#[derive(Clone)]
pub struct StoreMetrics {
    pub inserted: Arc<Counter>,
    pub updated: Arc<Counter>,
    pub unmatched: Arc<Counter>,
    pub wal_bytes: Arc<Counter>,
}

impl StoreMetrics {
    pub fn new() -> Self {
        StoreMetrics {
            inserted: Counter::new(),
            updated: Counter::new(),
            unmatched: Counter::new(),
            wal_bytes: Counter::new(),
        }
    }

    pub fn register_to(&self, registry: &mut MetricRegistry) {
        registry
            .register_counter(DOCUMENTS_INSERTED, self.inserted.clone())
            .register_counter(DOCUMENTS_UPDATED, self.updated.clone())
            .register_counter(UPDATES_UNMATCHED, self.unmatched.clone())
            .register_counter(WAL_BYTES_WRITTEN, self.wal_bytes.clone());
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}
