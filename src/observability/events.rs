//! Observable events
//!
//! Events are explicit and typed; their string names are stable.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    StartupBegin,
    StartupComplete,
    StartupFailed,
    ConfigLoaded,

    // Datastore
    TransactionBegin,
    TransactionRollback,
    CommitComplete,
    CommitRejected,

    // Data loading
    DataLoadComplete,
    StoreSize,

    // Selection and cube
    SelectionBuilt,
    FactViewMaterialized,
    CubeBuilt,

    // Queries
    QueryComplete,
    QueryRejected,
    PartialData,

    // Snapshot images
    ImageWritten,
    ImageRestored,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StartupBegin => "NANOPIVOT_STARTUP_BEGIN",
            Event::StartupComplete => "NANOPIVOT_STARTUP_COMPLETE",
            Event::StartupFailed => "NANOPIVOT_STARTUP_FAILED",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::CommitComplete => "DATASTORE_COMMIT",
            Event::CommitRejected => "DATASTORE_COMMIT_REJECTED",

            Event::DataLoadComplete => "DATA_LOAD_COMPLETE",
            Event::StoreSize => "STORE_SIZE",

            Event::SelectionBuilt => "SELECTION_BUILT",
            Event::FactViewMaterialized => "FACT_VIEW_MATERIALIZED",
            Event::CubeBuilt => "CUBE_BUILT",

            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::PartialData => "QUERY_PARTIAL_DATA",

            Event::ImageWritten => "SNAPSHOT_IMAGE_WRITTEN",
            Event::ImageRestored => "SNAPSHOT_IMAGE_RESTORED",
        }
    }

    /// Events describing a condition that stops the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StartupFailed)
    }

    /// Events describing a rejected or degraded operation
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::CommitRejected | Event::QueryRejected | Event::PartialData
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::CommitComplete.as_str(), "DATASTORE_COMMIT");
        assert_eq!(Event::DataLoadComplete.to_string(), "DATA_LOAD_COMPLETE");
    }

    #[test]
    fn test_event_classes() {
        assert!(Event::StartupFailed.is_fatal());
        assert!(Event::CommitRejected.is_warning());
        assert!(!Event::QueryComplete.is_warning());
    }
}
