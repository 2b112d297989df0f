//! Bounded, thread-safe memo table
//!
//! Holds values derived from immutable snapshots. Entries are evicted
//! oldest-first once `capacity` is reached. Values are computed outside the
//! lock, so readers never wait on each other's computation; two readers
//! missing the same key may both compute it and the later insert is dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

pub(crate) struct BoundedCache<K, V> {
    capacity: usize,
    entries: Mutex<VecDeque<(K, Arc<V>)>>,
}

impl<K: PartialEq, V> BoundedCache<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| Arc::clone(v))
    }

    /// Returns the cached value for `key`, inserting `value` when absent
    pub(crate) fn insert(&self, key: K, value: Arc<V>) -> Arc<V> {
        if self.capacity == 0 {
            return value;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, existing)) = entries.iter().find(|(k, _)| *k == key) {
            return Arc::clone(existing);
        }
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back((key, Arc::clone(&value)));
        value
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
