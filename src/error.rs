//! Error classification shared by every subsystem
//!
//! Each subsystem owns its error enum. All of them expose a stable string
//! code (`NANO_<AREA>_<KIND>`) and a severity so that an outer surface can
//! map them to distinct, stable failures.

use std::fmt;

/// How an error affects the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The request (transaction, query) is rejected; state is unchanged
    Reject,
    /// Configuration is unusable; startup must abort
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Reject => "REJECT",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable code and severity of an error
pub trait ErrorCode: std::error::Error {
    /// Stable string code, e.g. `NANO_COMMIT_KEY_COLLISION`
    fn code(&self) -> &'static str;

    /// Severity of the error
    fn severity(&self) -> Severity;

    fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
