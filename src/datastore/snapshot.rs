//! Immutable head snapshots
//!
//! A snapshot maps every store of the schema to its rows at one version.
//! Snapshots are shared through `Arc` and never change after publication.
//! Versions are only unique within one datastore, so a snapshot also carries
//! the id of the datastore that published it.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::schema::{SchemaDescription, Value};

use super::store::StoreRows;
use super::version::Version;

#[derive(Debug, Clone)]
pub struct Snapshot {
    datastore_id: Uuid,
    version: Version,
    schema: Arc<SchemaDescription>,
    stores: BTreeMap<String, Arc<StoreRows>>,
}

impl Snapshot {
    /// An empty snapshot with one empty row set per declared store
    pub(crate) fn empty(
        datastore_id: Uuid,
        schema: Arc<SchemaDescription>,
        version: Version,
    ) -> Self {
        let stores = schema
            .stores
            .iter()
            .map(|s| (s.name.clone(), Arc::new(StoreRows::new())))
            .collect();
        Self {
            datastore_id,
            version,
            schema,
            stores,
        }
    }

    pub(crate) fn from_parts(
        datastore_id: Uuid,
        version: Version,
        schema: Arc<SchemaDescription>,
        stores: BTreeMap<String, Arc<StoreRows>>,
    ) -> Self {
        Self {
            datastore_id,
            version,
            schema,
            stores,
        }
    }

    /// Id of the datastore that published this snapshot
    pub fn datastore_id(&self) -> Uuid {
        self.datastore_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> &Arc<SchemaDescription> {
        &self.schema
    }

    /// Rows of a store, `None` when the store is not declared
    pub fn store(&self, name: &str) -> Option<&StoreRows> {
        self.stores.get(name).map(Arc::as_ref)
    }

    pub(crate) fn stores(&self) -> &BTreeMap<String, Arc<StoreRows>> {
        &self.stores
    }

    /// Looks up one row by primary key
    pub fn lookup(&self, store: &str, key: &[Value]) -> Option<&Vec<Value>> {
        self.stores.get(store).and_then(|rows| rows.get(key))
    }

    /// Row count per store, in store-name order
    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.stores
            .iter()
            .map(|(name, rows)| (name.clone(), rows.len()))
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.stores.values().map(|rows| rows.len()).sum()
    }
}

/// Two snapshots are equal when they hold the same rows at the same version,
/// whichever datastore published them.
impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.schema == other.schema && self.stores == other.stores
    }
}
