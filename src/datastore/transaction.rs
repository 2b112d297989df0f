//! Transaction staging
//!
//! A `TransactionHandle` buffers operations privately. Nothing staged is
//! visible to readers or other transactions until commit publishes it.

use uuid::Uuid;

use crate::schema::{Key, Row};

use super::version::Version;

/// One staged operation
#[derive(Debug, Clone, PartialEq)]
pub enum StagedOp {
    /// Insert; the key must not exist at commit
    Add { store: String, key: Key, row: Row },
    /// Insert or replace
    Put { store: String, key: Key, row: Row },
    /// Delete; absent keys are ignored
    Remove { store: String, key: Key },
}

impl StagedOp {
    pub fn store(&self) -> &str {
        match self {
            StagedOp::Add { store, .. } | StagedOp::Put { store, .. } | StagedOp::Remove { store, .. } => {
                store
            }
        }
    }
}

/// Private staging buffer of one transaction
///
/// Handles are not `Clone`; a handle is consumed by `commit` or `rollback`.
#[derive(Debug)]
pub struct TransactionHandle {
    id: Uuid,
    base_version: Version,
    ops: Vec<StagedOp>,
}

impl TransactionHandle {
    pub(crate) fn new(base_version: Version) -> Self {
        Self {
            id: Uuid::new_v4(),
            base_version,
            ops: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Head version observed when the transaction began
    pub fn base_version(&self) -> Version {
        self.base_version
    }

    pub fn ops(&self) -> &[StagedOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn push(&mut self, op: StagedOp) {
        self.ops.push(op);
    }

    pub(crate) fn into_ops(self) -> Vec<StagedOp> {
        self.ops
    }
}
