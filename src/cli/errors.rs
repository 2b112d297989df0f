//! CLI-specific error types
//!
//! Every CLI error carries the stable code of the error that caused it.

use std::fmt;
use std::io;

use crate::aggregation::QueryError;
use crate::config::ConfigError;
use crate::error::ErrorCode;
use crate::manager::StartupError;
use crate::persistence::PersistenceError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Malformed command arguments
    InvalidArgument,
    /// I/O error on stdout
    IoError,
    /// A subsystem error, by its own code
    Subsystem(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "NANO_CLI_INVALID_ARGUMENT",
            Self::IoError => "NANO_CLI_IO_ERROR",
            Self::Subsystem(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    fn subsystem<E: ErrorCode>(err: &E) -> Self {
        Self::new(CliErrorCode::Subsystem(err.code()), err.to_string())
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::subsystem(&e)
    }
}

impl From<StartupError> for CliError {
    fn from(e: StartupError) -> Self {
        Self::subsystem(&e)
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        Self::subsystem(&e)
    }
}

impl From<PersistenceError> for CliError {
    fn from(e: PersistenceError) -> Self {
        Self::subsystem(&e)
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
