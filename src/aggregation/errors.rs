//! Query error types
//!
//! Query errors reject a single query. They never affect the datastore or
//! the caches.

use thiserror::Error;

use crate::error::{ErrorCode, Severity};
use crate::selection::SelectionError;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown level '{path}'")]
    UnknownLevel { path: String },

    #[error("level '{path}' is ambiguous: {candidates}")]
    AmbiguousLevel { path: String, candidates: String },

    #[error("unknown hierarchy '{path}'")]
    UnknownHierarchy { path: String },

    #[error("hierarchy '{path}' is ambiguous: {candidates}")]
    AmbiguousHierarchy { path: String, candidates: String },

    #[error("unknown measure '{measure}'")]
    UnknownMeasure { measure: String },

    #[error("coordinate of depth {depth} does not fit hierarchy '{hierarchy}' of {levels} levels")]
    InvalidCoordinate {
        hierarchy: String,
        depth: usize,
        levels: usize,
    },

    #[error("filter member of level '{level}' must be {expected}, got {actual}")]
    InvalidFilterMember {
        level: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("measure '{measure}' met {null_rows} null values in '{column}'")]
    PartialData {
        measure: String,
        column: String,
        null_rows: u64,
    },

    #[error("fact view unavailable: {0}")]
    Selection(#[from] SelectionError),
}

impl ErrorCode for QueryError {
    fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownLevel { .. } => "NANO_QUERY_UNKNOWN_LEVEL",
            QueryError::AmbiguousLevel { .. } => "NANO_QUERY_AMBIGUOUS_LEVEL",
            QueryError::UnknownHierarchy { .. } => "NANO_QUERY_UNKNOWN_HIERARCHY",
            QueryError::AmbiguousHierarchy { .. } => "NANO_QUERY_AMBIGUOUS_HIERARCHY",
            QueryError::UnknownMeasure { .. } => "NANO_QUERY_UNKNOWN_MEASURE",
            QueryError::InvalidCoordinate { .. } => "NANO_QUERY_INVALID_COORDINATE",
            QueryError::InvalidFilterMember { .. } => "NANO_QUERY_INVALID_FILTER_MEMBER",
            QueryError::PartialData { .. } => "NANO_QUERY_PARTIAL_DATA",
            QueryError::Selection(_) => "NANO_QUERY_SELECTION",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Reject
    }
}
