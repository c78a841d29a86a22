use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    BsonDeError(bson::de::Error),
    BsonSerError(bson::ser::Error),
    InvalidRequest(String),
    UnexpectedError(String),
    /// An update reached a value whose type does not support the operation.
    TypeMismatch { path: String, expected: &'static str, found: &'static str },
    LogCorruption { record_offset: u64, reason: String },
    DuplicateEmail(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{}", e),
            Error::BsonSerError(e) => write!(f, "{}", e),
            Error::BsonDeError(e) => write!(f, "{}", e),
            Error::InvalidRequest(reason) | Error::UnexpectedError(reason) => write!(f, "{}", reason),
            Error::TypeMismatch { path, expected, found } => {
                write!(f, "Type mismatch at '{}': expected {} but found {}", path, expected, found)
            }
            Error::LogCorruption { record_offset, reason } => {
                write!(f, "Log corruption at offset {}: {}", record_offset, reason)
            }
            Error::DuplicateEmail(email) => write!(f, "Email already registered: {}", email),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<bson::de::Error> for Error {
    fn from(err: bson::de::Error) -> Self {
        Error::BsonDeError(err)
    }
}

impl From<bson::ser::Error> for Error {
    fn from(err: bson::ser::Error) -> Self {
        Error::BsonSerError(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
