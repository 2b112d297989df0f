//! Fact view memoization per snapshot
//!
//! Entries are keyed by datastore id and version, so one cache can serve
//! snapshots of several datastores.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::BoundedCache;
use crate::datastore::{Snapshot, Version};
use crate::observability::{trace_event, Event, MetricsRegistry, Timer};

use super::plan::Selection;
use super::view::FactView;

pub struct FactViewCache {
    entries: BoundedCache<(Uuid, Version), FactView>,
    metrics: Arc<MetricsRegistry>,
}

impl FactViewCache {
    pub fn new(capacity: usize, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            entries: BoundedCache::new(capacity),
            metrics,
        }
    }

    /// Returns the fact view of `snapshot`, materializing it on first use
    pub fn get_or_materialize(&self, selection: &Selection, snapshot: &Snapshot) -> Arc<FactView> {
        let key = (snapshot.datastore_id(), snapshot.version());
        if let Some(view) = self.entries.get(&key) {
            return view;
        }

        let timer = Timer::new();
        let view = Arc::new(selection.materialize(snapshot));
        self.metrics.increment_fact_views();
        let version = snapshot.version().to_string();
        let rows = view.len().to_string();
        trace_event(
            Event::FactViewMaterialized,
            &[
                ("version", &version),
                ("rows", &rows),
                ("elapsed_us", &timer.elapsed_us()),
            ],
        );
        self.entries.insert(key, view)
    }

    /// Number of cached views
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
