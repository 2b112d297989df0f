//! Cube error types
//!
//! A cube is configuration: its errors are FATAL to startup.

use thiserror::Error;

use crate::error::{ErrorCode, Severity};

pub type CubeResult<T> = Result<T, CubeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CubeError {
    #[error("'{owner}' reads unknown column '{column}'")]
    UnknownColumn { owner: String, column: String },

    #[error("hierarchy '{hierarchy}' violates level order: {detail}")]
    LevelOrderViolation { hierarchy: String, detail: String },

    #[error("{kind} '{name}' is declared more than once")]
    DuplicateName { kind: &'static str, name: String },

    #[error("'{path}' declares no levels")]
    EmptyHierarchy { path: String },

    #[error("time level '{level}' reads column '{column}' of type {field_type}")]
    InvalidTimeLevel {
        level: String,
        column: String,
        field_type: String,
    },

    #[error("measure '{measure}': {detail}")]
    InvalidMeasure { measure: String, detail: String },

    #[error("'{owner}' uses unknown formatter '{formatter}'")]
    InvalidFormatter { owner: String, formatter: String },
}

impl ErrorCode for CubeError {
    fn code(&self) -> &'static str {
        match self {
            CubeError::UnknownColumn { .. } => "NANO_CUBE_UNKNOWN_COLUMN",
            CubeError::LevelOrderViolation { .. } => "NANO_CUBE_LEVEL_ORDER_VIOLATION",
            CubeError::DuplicateName { .. } => "NANO_CUBE_DUPLICATE_NAME",
            CubeError::EmptyHierarchy { .. } => "NANO_CUBE_EMPTY_HIERARCHY",
            CubeError::InvalidTimeLevel { .. } => "NANO_CUBE_INVALID_TIME_LEVEL",
            CubeError::InvalidMeasure { .. } => "NANO_CUBE_INVALID_MEASURE",
            CubeError::InvalidFormatter { .. } => "NANO_CUBE_INVALID_FORMATTER",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}
