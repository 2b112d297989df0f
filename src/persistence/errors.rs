//! Snapshot image error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::datastore::{CommitError, StageError};
use crate::error::{ErrorCode, Severity};
use crate::schema::SchemaError;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed snapshot image: {0}")]
    Malformed(String),

    #[error("unsupported image format version {found} (expected {expected})")]
    UnsupportedFormat { found: u8, expected: u8 },

    #[error("image checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch { recorded: String, computed: String },

    #[error("image schema is invalid: {0}")]
    InvalidSchema(#[from] SchemaError),

    #[error("image rows rejected: {0}")]
    Stage(#[from] StageError),

    #[error("image rows violate constraints: {0}")]
    Commit(#[from] CommitError),
}

impl PersistenceError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ErrorCode for PersistenceError {
    fn code(&self) -> &'static str {
        match self {
            PersistenceError::Io { .. } => "NANO_PERSIST_IO",
            PersistenceError::Malformed(_) => "NANO_PERSIST_MALFORMED",
            PersistenceError::UnsupportedFormat { .. } => "NANO_PERSIST_UNSUPPORTED_FORMAT",
            PersistenceError::ChecksumMismatch { .. } => "NANO_PERSIST_CHECKSUM_MISMATCH",
            PersistenceError::InvalidSchema(_) => "NANO_PERSIST_INVALID_SCHEMA",
            PersistenceError::Stage(_) => "NANO_PERSIST_STAGE",
            PersistenceError::Commit(_) => "NANO_PERSIST_COMMIT",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            PersistenceError::Io { .. } => Severity::Reject,
            _ => Severity::Fatal,
        }
    }
}
