use std::path::Path;
use std::sync::Arc;
use bson::{doc, Document};
use crate::error::{Error, Result};
use crate::obs::logger::LoggerAndTracer;
use crate::obs::metrics::StoreMetrics;
use crate::storage::append_log::{AppendLog, LogReplayError};
use crate::{event, info, warn};

/// The current version of the write-ahead log format.
const WAL_VERSION: u32 = 1;

const MAGIC_NUMBER: u32 = 0x54757444; // "TutD" in ASCII hex

pub const WAL_FILE_NAME: &str = "tutordb.log";

/// A committed document: the full content of `collection` at `slot`.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRecord {
    pub collection: String,
    pub slot: u64,
    pub document: Document,
}

impl PutRecord {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let slot = self.slot as i64;
        let record = doc! {
            "c": self.collection.as_str(),
            "s": slot,
            "d": self.document.clone()
        };
        let mut bytes = Vec::new();
        record.to_writer(&mut bytes)?;
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record = Document::from_reader(&mut &bytes[..])?;
        let invalid = |field: &str| Error::UnexpectedError(format!("Invalid WAL record field '{}'", field));

        let collection = record.get_str("c").map_err(|_| invalid("c"))?.to_string();
        let slot = record.get_i64("s").map_err(|_| invalid("s"))?;
        let document = record.get_document("d").map_err(|_| invalid("d"))?.clone();
        Ok(PutRecord { collection, slot: slot as u64, document })
    }
}

pub struct WriteAheadLog {
    logger: Arc<dyn LoggerAndTracer>,
    metrics: StoreMetrics,
    append_log: AppendLog,
}

impl From<LogReplayError> for Error {
    fn from(err: LogReplayError) -> Self {
        match err {
            LogReplayError::Corruption { record_offset, reason } => Error::LogCorruption { record_offset, reason },
        }
    }
}

impl WriteAheadLog {
    /// Opens the log stored in `directory` and returns the records to replay.
    pub fn open(
        logger: Arc<dyn LoggerAndTracer>,
        metrics: StoreMetrics,
        directory: &Path,
        bytes_per_sync: usize,
    ) -> Result<(Self, Vec<PutRecord>)> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(WAL_FILE_NAME);
        let (append_log, replay) = AppendLog::open(&path, MAGIC_NUMBER, WAL_VERSION, bytes_per_sync)?;

        if let Some(corruption) = replay.corruption {
            let error = Error::from(corruption);
            warn!(logger, "Dropping the WAL tail. {}", error);
        }

        let records = replay
            .records
            .iter()
            .map(|bytes| PutRecord::from_bytes(bytes))
            .collect::<Result<Vec<_>>>()?;

        info!(logger, "WAL opened at path: {:?}, records={}", append_log.file_path(), records.len());

        Ok((WriteAheadLog { logger, metrics, append_log }, records))
    }

    pub fn append(&mut self, record: &PutRecord) -> Result<()> {
        let bytes = self.append_log.append(&record.to_bytes()?)?;
        self.metrics.wal_bytes.inc_by(bytes as u64);
        event!(self.logger, "wal append, collection={}, slot={}, bytes={}", record.collection, record.slot, bytes);
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        Ok(self.append_log.sync()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::logger::test_instance;
    use tempfile::tempdir;

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let record = PutRecord {
            collection: "users".to_string(),
            slot: 0,
            document: doc! { "email": "kid@example.com", "progress": { "Reading": 5 } },
        };

        {
            let (mut wal, records) = WriteAheadLog::open(test_instance(), StoreMetrics::new(), dir.path(), 0).unwrap();
            assert!(records.is_empty());
            wal.append(&record).unwrap();
        }

        let metrics = StoreMetrics::new();
        let (_wal, records) = WriteAheadLog::open(test_instance(), metrics.clone(), dir.path(), 0).unwrap();
        assert_eq!(records, vec![record]);
        assert_eq!(metrics.wal_bytes.get(), 0);
    }
}
