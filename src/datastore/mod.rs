//! Transactional multi-store datastore
//!
//! - Rows are staged in a private `TransactionHandle`
//! - `commit` applies staged operations to the current head, checks key
//!   uniqueness and referential integrity, and publishes a new snapshot
//! - Readers clone the head `Arc` and never wait on staging or commits
//!
//! # Concurrency
//!
//! The head pointer is the only mutable shared state. Commits are serialized
//! by `commit_lock`, held while the post-transaction state is built and
//! checked and while the head is swapped. The head read lock is held only
//! long enough to clone the `Arc`.

mod errors;
mod snapshot;
mod store;
mod transaction;
mod version;

pub use errors::{CommitError, CommitResult, StageError, StageResult};
pub use snapshot::Snapshot;
pub use store::StoreRows;
pub use transaction::{StagedOp, TransactionHandle};
pub use version::Version;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::observability::{log_event, trace_event, Event, MetricsRegistry, Timer};
use crate::schema::{
    self, render_key, Key, Row, SchemaDescription, SchemaResult, SchemaValidator,
    StoreDescription, Value,
};

/// Construction options of a datastore
#[derive(Debug, Clone)]
pub struct DatastoreOptions {
    /// Longest wait for the commit lock; `None` waits indefinitely
    pub commit_timeout: Option<Duration>,
    /// Version of the initial empty head
    pub initial_version: Version,
    pub metrics: Arc<MetricsRegistry>,
}

impl Default for DatastoreOptions {
    fn default() -> Self {
        Self {
            commit_timeout: None,
            initial_version: Version::INITIAL,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }
}

/// Monitoring view of a datastore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatastoreStats {
    pub version: Version,
    pub row_counts: BTreeMap<String, usize>,
    pub last_commit_latency_us: Option<u64>,
    pub commits: u64,
    pub rollbacks: u64,
    pub failed_commits: u64,
}

#[derive(Debug)]
pub struct Datastore {
    id: Uuid,
    schema: Arc<SchemaDescription>,
    head: RwLock<Arc<Snapshot>>,
    commit_lock: Mutex<()>,
    commit_timeout: Option<Duration>,
    metrics: Arc<MetricsRegistry>,
}

impl Datastore {
    /// Creates an empty datastore.
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaError` of an invalid schema.
    pub fn new(schema: SchemaDescription) -> SchemaResult<Self> {
        Self::with_options(schema, DatastoreOptions::default())
    }

    pub fn with_options(schema: SchemaDescription, options: DatastoreOptions) -> SchemaResult<Self> {
        schema::validate(&schema)?;
        let schema = Arc::new(schema);
        let id = Uuid::new_v4();
        let head = Snapshot::empty(id, Arc::clone(&schema), options.initial_version);
        Ok(Self {
            id,
            schema,
            head: RwLock::new(Arc::new(head)),
            commit_lock: Mutex::new(()),
            commit_timeout: options.commit_timeout,
            metrics: options.metrics,
        })
    }

    /// Unique id, carried by every snapshot this datastore publishes
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Current head snapshot
    pub fn head(&self) -> Arc<Snapshot> {
        let head = self.head.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&head)
    }

    pub fn begin_transaction(&self) -> TransactionHandle {
        let handle = TransactionHandle::new(self.head().version());
        let txn = handle.id().to_string();
        let base = handle.base_version().to_string();
        trace_event(Event::TransactionBegin, &[("txn", &txn), ("base_version", &base)]);
        handle
    }

    /// Stages an insert. The key must be absent when the transaction commits.
    pub fn add(&self, handle: &mut TransactionHandle, store: &str, row: Row) -> StageResult<()> {
        let (key, row) = self.check_row(store, row)?;
        handle.push(StagedOp::Add {
            store: store.to_string(),
            key,
            row,
        });
        Ok(())
    }

    /// Stages an insert-or-replace
    pub fn put(&self, handle: &mut TransactionHandle, store: &str, row: Row) -> StageResult<()> {
        let (key, row) = self.check_row(store, row)?;
        handle.push(StagedOp::Put {
            store: store.to_string(),
            key,
            row,
        });
        Ok(())
    }

    /// Stages a delete by primary key. Absent keys are ignored at commit.
    pub fn remove(&self, handle: &mut TransactionHandle, store: &str, key: Key) -> StageResult<()> {
        let description = self.store_description(store)?;
        let key = SchemaValidator::new(&self.schema)
            .validate_key(description, key)
            .map_err(|violation| StageError::SchemaViolation {
                store: store.to_string(),
                violation,
            })?;
        handle.push(StagedOp::Remove {
            store: store.to_string(),
            key,
        });
        Ok(())
    }

    /// Discards a transaction
    pub fn rollback(&self, handle: TransactionHandle) {
        self.metrics.increment_rollbacks();
        let txn = handle.id().to_string();
        let ops = handle.len().to_string();
        log_event(Event::TransactionRollback, &[("txn", &txn), ("ops", &ops)]);
    }

    /// Applies a transaction atomically and publishes a new head.
    ///
    /// Operations are applied in staging order to the head current at
    /// commit time, whatever head the transaction began against.
    ///
    /// # Errors
    ///
    /// - `KeyCollision` when an add meets an existing key
    /// - `DanglingReference` when a reference of the post-transaction state
    ///   points at a missing row
    /// - `Contended` when the commit lock is not acquired in time
    ///
    /// On error the head is unchanged.
    pub fn commit(&self, handle: TransactionHandle) -> CommitResult<Version> {
        let timer = Timer::new();
        let txn = handle.id().to_string();

        let result = self.acquire_commit_lock().and_then(|_guard| {
            let current = self.head();
            let applied = self.apply(&current, handle.into_ops())?;
            let version = applied.snapshot.version();
            {
                let mut head = self.head.write().unwrap_or_else(PoisonError::into_inner);
                *head = Arc::new(applied.snapshot);
            }
            Ok((version, applied.added, applied.removed))
        });

        match result {
            Ok((version, added, removed)) => {
                self.metrics.record_commit(timer.elapsed(), added, removed);
                let version_str = version.to_string();
                let added_str = added.to_string();
                let removed_str = removed.to_string();
                let elapsed_us = timer.elapsed_us();
                log_event(
                    Event::CommitComplete,
                    &[
                        ("txn", &txn),
                        ("version", &version_str),
                        ("added", &added_str),
                        ("removed", &removed_str),
                        ("elapsed_us", &elapsed_us),
                    ],
                );
                Ok(version)
            }
            Err(err) => {
                self.metrics.increment_failed_commits();
                let reason = err.to_string();
                log_event(
                    Event::CommitRejected,
                    &[("txn", &txn), ("code", err.code()), ("reason", &reason)],
                );
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> DatastoreStats {
        let head = self.head();
        let metrics = self.metrics.snapshot();
        DatastoreStats {
            version: head.version(),
            row_counts: head.row_counts(),
            last_commit_latency_us: metrics.last_commit_latency_us,
            commits: metrics.commits,
            rollbacks: metrics.rollbacks,
            failed_commits: metrics.failed_commits,
        }
    }

    fn store_description(&self, store: &str) -> StageResult<&StoreDescription> {
        self.schema.store(store).ok_or_else(|| StageError::UnknownStore {
            store: store.to_string(),
        })
    }

    fn check_row(&self, store: &str, row: Row) -> StageResult<(Key, Row)> {
        let description = self.store_description(store)?;
        let row = SchemaValidator::new(&self.schema)
            .validate_row(description, row)
            .map_err(|violation| StageError::SchemaViolation {
                store: store.to_string(),
                violation,
            })?;
        Ok((description.key_of(&row), row))
    }

    fn acquire_commit_lock(&self) -> CommitResult<MutexGuard<'_, ()>> {
        let timeout = match self.commit_timeout {
            None => return Ok(self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner)),
            Some(timeout) => timeout,
        };

        let started = Instant::now();
        loop {
            match self.commit_lock.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if started.elapsed() >= timeout {
                        return Err(CommitError::Contended {
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    thread::sleep(Duration::from_micros(200));
                }
            }
        }
    }

    /// Builds the post-transaction snapshot. Only touched stores are copied.
    fn apply(&self, base: &Snapshot, ops: Vec<StagedOp>) -> CommitResult<Applied> {
        let mut stores = base.stores().clone();
        let mut written: BTreeMap<String, BTreeSet<Key>> = BTreeMap::new();
        let mut deleted: BTreeMap<String, BTreeSet<Key>> = BTreeMap::new();
        let mut added = 0u64;
        let mut removed = 0u64;

        for op in ops {
            // Staging only accepts stores of this schema
            let Some(rows) = stores.get_mut(op.store()) else {
                continue;
            };
            match op {
                StagedOp::Add { store, key, row } => {
                    if rows.contains(&key) {
                        return Err(CommitError::KeyCollision {
                            store,
                            key: render_key(&key),
                        });
                    }
                    Arc::make_mut(rows).insert(key.clone(), row);
                    added += 1;
                    written.entry(store).or_default().insert(key);
                }
                StagedOp::Put { store, key, row } => {
                    if Arc::make_mut(rows).insert(key.clone(), row).is_none() {
                        added += 1;
                    }
                    written.entry(store).or_default().insert(key);
                }
                StagedOp::Remove { store, key } => {
                    if !rows.contains(&key) {
                        continue;
                    }
                    Arc::make_mut(rows).remove(&key);
                    removed += 1;
                    deleted.entry(store).or_default().insert(key);
                }
            }
        }

        let snapshot = Snapshot::from_parts(
            base.datastore_id(),
            base.version().next(),
            Arc::clone(base.schema_arc()),
            stores,
        );
        check_references(&snapshot, &written, &deleted)?;

        Ok(Applied {
            snapshot,
            added,
            removed,
        })
    }
}

struct Applied {
    snapshot: Snapshot,
    added: u64,
    removed: u64,
}

/// Checks every reference touched by a transaction against its post-state.
///
/// Written source rows must point at existing targets. Deleted target rows
/// must no longer be pointed at by any source row.
fn check_references(
    post: &Snapshot,
    written: &BTreeMap<String, BTreeSet<Key>>,
    deleted: &BTreeMap<String, BTreeSet<Key>>,
) -> CommitResult<()> {
    let schema = post.schema();
    for reference in &schema.references {
        let Some(indices) = schema.source_key_indices(reference) else {
            continue;
        };
        let (Some(from_rows), Some(to_rows)) =
            (post.store(&reference.from_store), post.store(&reference.to_store))
        else {
            continue;
        };

        let dangling = |from_key: &Key, target: Key| CommitError::DanglingReference {
            reference: reference.name.clone(),
            from_store: reference.from_store.clone(),
            from_key: render_key(from_key),
            to_store: reference.to_store.clone(),
            to_key: render_key(&target),
        };

        if let Some(keys) = written.get(&reference.from_store) {
            for key in keys {
                let Some(row) = from_rows.get(key) else {
                    continue;
                };
                if let Some(target) = target_key(row, &indices) {
                    if !to_rows.contains(&target) {
                        return Err(dangling(key, target));
                    }
                }
            }
        }

        if let Some(gone) = deleted.get(&reference.to_store) {
            for (key, row) in from_rows.iter() {
                if let Some(target) = target_key(row, &indices) {
                    if gone.contains(&target) && !to_rows.contains(&target) {
                        return Err(dangling(key, target));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Target key of a source row; `None` when a source field is null
pub(crate) fn target_key(row: &[Value], indices: &[usize]) -> Option<Key> {
    indices
        .iter()
        .map(|&i| row.get(i).filter(|v| !v.is_null()).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescription, FieldType, ReferenceDescription};

    fn schema() -> SchemaDescription {
        SchemaDescription::new(
            vec![
                StoreDescription::new(
                    "Orders",
                    vec![
                        FieldDescription::key("id", FieldType::Int),
                        FieldDescription::nullable("productId", FieldType::String),
                        FieldDescription::new("sales", FieldType::Double),
                    ],
                ),
                StoreDescription::new(
                    "Products",
                    vec![
                        FieldDescription::key("id", FieldType::String),
                        FieldDescription::new("name", FieldType::String),
                    ],
                ),
            ],
            vec![ReferenceDescription::new("orderToProduct", "Orders", "Products")
                .with_mapping("productId", "id")],
        )
    }

    fn product(id: &str) -> Row {
        vec![Value::from(id), Value::from(format!("{} name", id))]
    }

    fn order(id: i64, product: &str, sales: f64) -> Row {
        vec![Value::from(id), Value::from(product), Value::from(sales)]
    }

    #[test]
    fn test_commit_publishes_next_version() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store.add(&mut txn, "Orders", order(1, "P1", 10.0)).unwrap();

        assert_eq!(store.commit(txn).unwrap(), Version::new(1));
        let head = store.head();
        assert_eq!(head.version(), Version::new(1));
        assert_eq!(head.store("Orders").unwrap().len(), 1);
    }

    #[test]
    fn test_snapshots_carry_their_datastore_id() {
        let first = Datastore::new(schema()).unwrap();
        let second = Datastore::new(schema()).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.head().datastore_id(), first.id());

        let mut txn = first.begin_transaction();
        first.add(&mut txn, "Products", product("P1")).unwrap();
        first.commit(txn).unwrap();
        assert_eq!(first.head().datastore_id(), first.id());
    }

    #[test]
    fn test_int_widens_to_double_on_stage() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store
            .add(&mut txn, "Orders", vec![Value::from(1), Value::from("P1"), Value::from(2790)])
            .unwrap();
        store.commit(txn).unwrap();

        let row = store.head().lookup("Orders", &[Value::from(1)]).cloned().unwrap();
        assert_eq!(row[2], Value::Double(2790.0));
    }

    #[test]
    fn test_stage_rejects_unknown_store() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        let err = store.add(&mut txn, "Customers", product("x")).unwrap_err();
        assert_eq!(err.code(), "NANO_STAGE_UNKNOWN_STORE");
        assert!(txn.is_empty());
    }

    #[test]
    fn test_stage_rejects_wrong_arity() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        let err = store
            .add(&mut txn, "Products", vec![Value::from("P1")])
            .unwrap_err();
        assert!(matches!(err, StageError::SchemaViolation { .. }));
    }

    #[test]
    fn test_key_collision_leaves_head_untouched() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store.commit(txn).unwrap();
        let before = store.head();

        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P2")).unwrap();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        let err = store.commit(txn).unwrap_err();

        assert!(matches!(err, CommitError::KeyCollision { .. }));
        assert_eq!(*store.head(), *before);
        assert_eq!(store.stats().failed_commits, 1);
    }

    #[test]
    fn test_put_replaces_existing_row() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store
            .put(&mut txn, "Products", vec![Value::from("P1"), Value::from("renamed")])
            .unwrap();
        store.commit(txn).unwrap();

        let row = store.head().lookup("Products", &[Value::from("P1")]).cloned().unwrap();
        assert_eq!(row[1], Value::from("renamed"));
    }

    #[test]
    fn test_null_source_field_is_not_checked() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store
            .add(&mut txn, "Orders", vec![Value::from(1), Value::Null, Value::from(5.0)])
            .unwrap();
        assert!(store.commit(txn).is_ok());
    }

    #[test]
    fn test_removing_referenced_row_dangles() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store.add(&mut txn, "Orders", order(1, "P1", 10.0)).unwrap();
        store.commit(txn).unwrap();

        let mut txn = store.begin_transaction();
        store.remove(&mut txn, "Products", vec![Value::from("P1")]).unwrap();
        let err = store.commit(txn).unwrap_err();
        assert_eq!(err.code(), "NANO_COMMIT_DANGLING_REFERENCE");
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.remove(&mut txn, "Products", vec![Value::from("nope")]).unwrap();
        assert_eq!(store.commit(txn).unwrap(), Version::new(1));
        assert_eq!(store.head().total_rows(), 0);
    }

    #[test]
    fn test_rollback_discards() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store.rollback(txn);

        assert_eq!(store.head().version(), Version::INITIAL);
        assert_eq!(store.stats().rollbacks, 1);
    }

    #[test]
    fn test_untouched_stores_are_shared() {
        let store = Datastore::new(schema()).unwrap();
        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Products", product("P1")).unwrap();
        store.commit(txn).unwrap();
        let first = store.head();

        let mut txn = store.begin_transaction();
        store.add(&mut txn, "Orders", order(1, "P1", 1.0)).unwrap();
        store.commit(txn).unwrap();
        let second = store.head();

        assert!(Arc::ptr_eq(
            &first.stores()["Products"],
            &second.stores()["Products"]
        ));
    }

    #[test]
    fn test_commit_times_out_when_contended() {
        let options = DatastoreOptions {
            commit_timeout: Some(Duration::from_millis(5)),
            ..DatastoreOptions::default()
        };
        let store = Datastore::with_options(schema(), options).unwrap();
        let _held = store.commit_lock.lock().unwrap();

        let txn = store.begin_transaction();
        let err = store.commit(txn).unwrap_err();
        assert!(matches!(err, CommitError::Contended { .. }));
    }

    #[test]
    fn test_target_key_skips_nulls() {
        let row = vec![Value::from(1), Value::Null];
        assert_eq!(target_key(&row, &[1]), None);
        assert_eq!(target_key(&row, &[0]), Some(vec![Value::from(1)]));
    }
}
