//! Datastore version
//!
//! - Totally orders all commits
//! - Assigned exactly once, by a successful commit
//! - Successive commits increase it by exactly one
//! - Version 0 is the empty datastore before any commit

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a published head snapshot
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of a datastore that has never committed
    pub const INITIAL: Version = Version(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The version assigned by the next commit
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
