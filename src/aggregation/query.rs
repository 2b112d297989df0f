//! Aggregation queries

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cube::LevelPath;
use crate::schema::Value;

/// Measures to compute, grouped by levels, over the rows passing every
/// filter.
///
/// Queries are plain values: equal queries against the same snapshot
/// return identical results, which is what lets the engine cache them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub measures: Vec<String>,
    #[serde(default)]
    pub group_by: Vec<LevelPath>,
    /// Level -> members a row must hold to be aggregated
    #[serde(default)]
    pub filters: BTreeMap<LevelPath, BTreeSet<Value>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure(mut self, name: impl Into<String>) -> Self {
        self.measures.push(name.into());
        self
    }

    pub fn group_by(mut self, level: impl Into<LevelPath>) -> Self {
        self.group_by.push(level.into());
        self
    }

    /// Restricts a level to the given members. Repeated filters on the same
    /// level accumulate members.
    pub fn filter<I, V>(mut self, level: impl Into<LevelPath>, members: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters
            .entry(level.into())
            .or_default()
            .extend(members.into_iter().map(Into::into));
        self
    }
}
