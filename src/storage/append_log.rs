use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Error, ErrorKind, Result, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use crc32fast::Hasher;

/// Size of the file header: magic number followed by the format version.
pub const HEADER_SIZE: u64 = 8;

/// Size of the framing around a record: size, size crc and data crc.
const RECORD_OVERHEAD: usize = 12;

/// An append-only file of length-prefixed, checksummed records.
///
/// Each record is laid out as `[size: u32 BE][crc32(size)][data][crc32(data)]`.
pub struct AppendLog {
    path: PathBuf,
    file: File,
    file_size: u64,
    bytes_per_sync: usize,
    pending_bytes: usize,
}

/// The records recovered from an existing log.
pub struct Replay {
    pub records: Vec<Vec<u8>>,
    /// The number of bytes, header included, covered by valid records.
    pub valid_len: u64,
    /// The reason replay stopped before the end of the file, if it did.
    pub corruption: Option<LogReplayError>,
}

impl AppendLog {
    /// Opens the log at `path`, creating it if needed, and returns the records it holds.
    ///
    /// Replay stops at the first invalid record; the file is truncated back to the last
    /// valid record so that new appends remain readable.
    pub fn open(path: &Path, magic: u32, version: u32, bytes_per_sync: usize) -> Result<(Self, Replay)> {
        let replay = if path.exists() {
            Self::replay(path, magic, version)?
        } else {
            Replay { records: Vec::new(), valid_len: 0, corruption: None }
        };

        let mut file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
        let mut file_size = replay.valid_len;
        file.set_len(file_size)?;
        file.seek(SeekFrom::End(0))?;

        if file_size < HEADER_SIZE {
            let mut header = Vec::with_capacity(HEADER_SIZE as usize);
            header.extend_from_slice(&magic.to_be_bytes());
            header.extend_from_slice(&version.to_be_bytes());
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&header)?;
            file.sync_all()?;
            file_size = HEADER_SIZE;
        }

        let log = AppendLog {
            path: path.to_path_buf(),
            file,
            file_size,
            bytes_per_sync,
            pending_bytes: 0,
        };
        Ok((log, replay))
    }

    /// Reads the records of the log at `path` without modifying it.
    pub fn replay(path: &Path, magic: u32, version: u32) -> Result<Replay> {
        let bytes = fs::read(path)?;

        if bytes.len() < HEADER_SIZE as usize {
            let corruption = (!bytes.is_empty()).then(|| LogReplayError::Corruption {
                record_offset: 0,
                reason: "Truncated log header".to_string(),
            });
            return Ok(Replay { records: Vec::new(), valid_len: 0, corruption });
        }

        let file_magic = read_u32_be(&bytes, 0);
        if file_magic != magic {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("{:?} is not a log file (magic {:#x})", path, file_magic),
            ));
        }
        let file_version = read_u32_be(&bytes, 4);
        if file_version != version {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Unsupported log version {} in {:?}", file_version, path),
            ));
        }

        let mut records = Vec::new();
        let mut offset = HEADER_SIZE as usize;
        let mut corruption = None;

        while offset < bytes.len() {
            match read_record(&bytes, offset) {
                Ok(data) => {
                    offset += data.len() + RECORD_OVERHEAD;
                    records.push(data);
                }
                Err(reason) => {
                    corruption = Some(LogReplayError::Corruption {
                        record_offset: offset as u64,
                        reason: format!("{} in {:?}. Stopping replay.", reason, path),
                    });
                    break;
                }
            }
        }

        Ok(Replay { records, valid_len: offset as u64, corruption })
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Returns the size of the log file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Appends a record and returns the number of bytes written.
    pub fn append(&mut self, data: &[u8]) -> Result<usize> {
        let size = u32::try_from(data.len())
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "record exceeds 4GiB"))?;
        let size_as_bytes = size.to_be_bytes();

        let mut record = Vec::with_capacity(data.len() + RECORD_OVERHEAD);
        record.extend_from_slice(&size_as_bytes);
        record.extend_from_slice(&compute_crc32(&size_as_bytes));
        record.extend_from_slice(data);
        record.extend_from_slice(&compute_crc32(data));

        if let Err(e) = self.file.write_all(&record) {
            self.discard_partial_write()?;
            return Err(e);
        }
        self.file_size += record.len() as u64;
        self.pending_bytes += record.len();

        if self.pending_bytes >= self.bytes_per_sync {
            self.sync()?;
        }
        Ok(record.len())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.pending_bytes = 0;
        Ok(())
    }

    /// Cuts the file back to the end of the last complete record, so that a record
    /// written only in part cannot hide the records appended after it.
    fn discard_partial_write(&mut self) -> Result<()> {
        self.file.set_len(self.file_size)?;
        self.file.seek(SeekFrom::Start(self.file_size))?;
        Ok(())
    }
}

impl Drop for AppendLog {
    fn drop(&mut self) {
        if self.pending_bytes > 0 {
            let _ = self.file.sync_data();
        }
    }
}

fn read_record(bytes: &[u8], offset: usize) -> std::result::Result<Vec<u8>, &'static str> {
    let remaining = bytes.len() - offset;
    if remaining < 8 {
        return Err("Reached an unexpected end of file while reading a record size");
    }
    let size_bytes = &bytes[offset..offset + 4];
    if compute_crc32(size_bytes) != bytes[offset + 4..offset + 8] {
        return Err("Invalid size checksum found");
    }
    let size = read_u32_be(bytes, offset) as usize;

    let data_start = offset + 8;
    if bytes.len() - data_start < size + 4 {
        return Err("Reached an unexpected end of file while reading data");
    }
    let data = &bytes[data_start..data_start + size];
    if compute_crc32(data) != bytes[data_start + size..data_start + size + 4] {
        return Err("Invalid data checksum found");
    }
    Ok(data.to_vec())
}

fn read_u32_be(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

fn compute_crc32(data: &[u8]) -> [u8; 4] {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_le_bytes()
}

#[derive(Debug)]
pub enum LogReplayError {
    Corruption { record_offset: u64, reason: String },
}

impl fmt::Display for LogReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogReplayError::Corruption { record_offset, reason } => {
                write!(f, "Log corruption at offset {}: {}", record_offset, reason)
            }
        }
    }
}
