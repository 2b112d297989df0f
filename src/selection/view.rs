//! Fact view materialization

use std::sync::Arc;

use crate::datastore::{Snapshot, Version};
use crate::schema::{Row, Value};

use super::plan::{FactColumn, Selection, BASE_STEP};

/// Denormalized rows of one snapshot: one tuple per base-store row, in
/// base key order
#[derive(Debug, Clone, PartialEq)]
pub struct FactView {
    version: Version,
    columns: Arc<[FactColumn]>,
    rows: Vec<Row>,
}

impl FactView {
    /// Version of the snapshot this view was built from
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn columns(&self) -> &[FactColumn] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Selection {
    /// Joins every base row of `snapshot` with the rows it references.
    ///
    /// A missing target leaves that store's columns null, along with the
    /// columns of every store joined through it.
    pub fn materialize(&self, snapshot: &Snapshot) -> FactView {
        let steps = self.steps();
        let columns: Arc<[FactColumn]> = self.columns().into();
        let mut rows = Vec::new();

        if let Some(base) = snapshot.store(self.base_store()) {
            rows.reserve(base.len());
            let mut joined: Vec<Option<&Row>> = vec![None; steps.len()];
            for base_row in base.rows() {
                joined[BASE_STEP] = Some(base_row);
                // Steps are in DFS order, so a parent precedes its children
                for index in 1..steps.len() {
                    let step = &steps[index];
                    joined[index] = joined[step.parent].and_then(|parent| {
                        let key = crate::datastore::target_key(parent, &step.source_indices)?;
                        snapshot.lookup(&step.store, &key)
                    });
                }
                let tuple = self
                    .sources()
                    .iter()
                    .map(|&(step, field)| {
                        joined[step]
                            .and_then(|row| row.get(field))
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                rows.push(tuple);
            }
        }

        FactView {
            version: snapshot.version(),
            columns,
            rows,
        }
    }
}
