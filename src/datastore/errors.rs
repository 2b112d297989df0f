//! Datastore error types
//!
//! Staging errors are raised immediately by `add` / `put` / `remove`.
//! Commit errors are raised by `commit` and leave the head unchanged.
//! Both are REJECT severity: the transaction fails, the datastore does not.

use thiserror::Error;

use crate::error::{ErrorCode, Severity};
use crate::schema::RowViolation;

pub type StageResult<T> = Result<T, StageError>;
pub type CommitResult<T> = Result<T, CommitError>;

/// A staged operation does not fit the schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("unknown store '{store}'")]
    UnknownStore { store: String },

    #[error("row rejected by store '{store}': {violation}")]
    SchemaViolation {
        store: String,
        violation: RowViolation,
    },
}

impl ErrorCode for StageError {
    fn code(&self) -> &'static str {
        match self {
            StageError::UnknownStore { .. } => "NANO_STAGE_UNKNOWN_STORE",
            StageError::SchemaViolation { .. } => "NANO_STAGE_SCHEMA_VIOLATION",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Reject
    }
}

/// The post-transaction state would break a constraint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("key {key} already exists in store '{store}'")]
    KeyCollision { store: String, key: String },

    #[error(
        "reference '{reference}' from '{from_store}' row {from_key} points at missing '{to_store}' row {to_key}"
    )]
    DanglingReference {
        reference: String,
        from_store: String,
        from_key: String,
        to_store: String,
        to_key: String,
    },

    #[error("commit lock not acquired within {waited_ms} ms")]
    Contended { waited_ms: u64 },
}

impl ErrorCode for CommitError {
    fn code(&self) -> &'static str {
        match self {
            CommitError::KeyCollision { .. } => "NANO_COMMIT_KEY_COLLISION",
            CommitError::DanglingReference { .. } => "NANO_COMMIT_DANGLING_REFERENCE",
            CommitError::Contended { .. } => "NANO_COMMIT_CONTENDED",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Reject
    }
}
