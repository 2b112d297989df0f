//! Rows of one store at one version
//!
//! Rows are kept in primary-key order so that every scan of a snapshot is
//! deterministic. A `StoreRows` is never mutated once published; commits
//! copy the stores they touch.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::schema::{Key, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreRows {
    rows: BTreeMap<Key, Row>,
}

impl StoreRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &[crate::schema::Value]) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &[crate::schema::Value]) -> bool {
        self.rows.contains_key(key)
    }

    /// Rows in key order
    pub fn iter(&self) -> btree_map::Iter<'_, Key, Row> {
        self.rows.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub(crate) fn insert(&mut self, key: Key, row: Row) -> Option<Row> {
        self.rows.insert(key, row)
    }

    pub(crate) fn remove(&mut self, key: &[crate::schema::Value]) -> Option<Row> {
        self.rows.remove(key)
    }
}
