//! Selection error types
//!
//! A selection is configuration: its errors are FATAL to startup.

use thiserror::Error;

use crate::error::{ErrorCode, Severity};

pub type SelectionResult<T> = Result<T, SelectionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown base store '{store}'")]
    UnknownStore { store: String },

    #[error("reference cycle reachable from '{base}': {path}")]
    CyclicReferences { base: String, path: String },
}

impl ErrorCode for SelectionError {
    fn code(&self) -> &'static str {
        match self {
            SelectionError::UnknownStore { .. } => "NANO_SELECTION_UNKNOWN_STORE",
            SelectionError::CyclicReferences { .. } => "NANO_SELECTION_CYCLIC_REFERENCES",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}
