//! Datastore Atomicity Tests
//!
//! - A commit publishes all of its operations or none of them
//! - Each successful commit increments the version by exactly one
//! - A rejected commit leaves the head untouched
//! - Snapshots are immutable once published
//! - Foreign keys never dangle in a published snapshot

use std::sync::Arc;

use nanopivot::datastore::{CommitError, Datastore, Version};
use nanopivot::sample::{self, STORE_ORDERS, STORE_PRODUCTS};
use nanopivot::schema::{Row, Value};
use nanopivot::ErrorCode;

// =============================================================================
// Helper Functions
// =============================================================================

fn loaded() -> Datastore {
    let datastore = Datastore::new(sample::schema()).unwrap();
    sample::load(&datastore).unwrap();
    datastore
}

fn order(id: i64, product: &str, sales: f64) -> Row {
    vec![
        Value::from(id),
        Value::date(2019, 3, 1),
        Value::from("Italy"),
        Value::from(product),
        Value::from(1),
        Value::from(sales),
    ]
}

// =============================================================================
// Version Tests
// =============================================================================

#[test]
fn test_new_datastore_is_empty_at_version_zero() {
    let datastore = Datastore::new(sample::schema()).unwrap();
    let head = datastore.head();
    assert_eq!(head.version(), Version::INITIAL);
    assert_eq!(head.total_rows(), 0);
    assert!(head.store(STORE_ORDERS).unwrap().is_empty());
}

#[test]
fn test_each_commit_increments_version_by_one() {
    let datastore = loaded();
    for i in 0..5 {
        let before = datastore.head().version();
        let mut txn = datastore.begin_transaction();
        datastore
            .add(&mut txn, STORE_ORDERS, order(100 + i, "SN-KD-55AF9", 10.0))
            .unwrap();
        let after = datastore.commit(txn).unwrap();
        assert_eq!(after.value(), before.value() + 1);
        assert_eq!(datastore.head().version(), after);
    }
}

#[test]
fn test_rollback_keeps_version() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .add(&mut txn, STORE_ORDERS, order(100, "SN-KD-55AF9", 10.0))
        .unwrap();
    datastore.rollback(txn);

    let stats = datastore.stats();
    assert_eq!(stats.version, Version::new(2));
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.row_counts[STORE_ORDERS], 8);
}

// =============================================================================
// All-or-Nothing Tests
// =============================================================================

/// The second add collides; the first must not be published.
#[test]
fn test_collision_rejects_whole_transaction() {
    let datastore = loaded();
    let before = datastore.head();

    let mut txn = datastore.begin_transaction();
    datastore
        .add(&mut txn, STORE_ORDERS, order(100, "SN-KD-55AF9", 10.0))
        .unwrap();
    datastore
        .add(&mut txn, STORE_ORDERS, order(1, "SN-KD-55AF9", 10.0))
        .unwrap();
    let err = datastore.commit(txn).unwrap_err();

    assert_eq!(err.code(), "NANO_COMMIT_KEY_COLLISION");
    assert!(Arc::ptr_eq(&before, &datastore.head()));
    assert!(datastore
        .head()
        .lookup(STORE_ORDERS, &[Value::from(100)])
        .is_none());
    assert_eq!(datastore.stats().failed_commits, 1);
}

#[test]
fn test_put_replaces_existing_row() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .put(&mut txn, STORE_ORDERS, order(1, "SN-KD-55AF9", 1.0))
        .unwrap();
    datastore.commit(txn).unwrap();

    let head = datastore.head();
    assert_eq!(head.lookup(STORE_ORDERS, &[Value::from(1)]).unwrap()[5], Value::from(1.0));
    assert_eq!(head.row_counts()[STORE_ORDERS], 8);
}

#[test]
fn test_add_then_remove_in_one_transaction() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .add(&mut txn, STORE_ORDERS, order(100, "SN-KD-55AF9", 10.0))
        .unwrap();
    datastore
        .remove(&mut txn, STORE_ORDERS, vec![Value::from(100)])
        .unwrap();
    datastore.commit(txn).unwrap();

    assert!(datastore
        .head()
        .lookup(STORE_ORDERS, &[Value::from(100)])
        .is_none());
    assert_eq!(datastore.head().version(), Version::new(3));
}

// =============================================================================
// Referential Integrity Tests
// =============================================================================

#[test]
fn test_order_for_missing_product_is_rejected() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .add(&mut txn, STORE_ORDERS, order(100, "NO-SUCH-PRODUCT", 10.0))
        .unwrap();
    let err = datastore.commit(txn).unwrap_err();

    match err {
        CommitError::DanglingReference {
            reference, to_store, ..
        } => {
            assert_eq!(reference, sample::REFERENCE_ORDER_TO_PRODUCT);
            assert_eq!(to_store, STORE_PRODUCTS);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(datastore.head().version(), Version::new(2));
}

#[test]
fn test_removing_referenced_product_is_rejected() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .remove(&mut txn, STORE_PRODUCTS, vec![Value::from("SN-KD-55AF9")])
        .unwrap();
    let err = datastore.commit(txn).unwrap_err();
    assert_eq!(err.code(), "NANO_COMMIT_DANGLING_REFERENCE");
    assert!(datastore
        .head()
        .lookup(STORE_PRODUCTS, &[Value::from("SN-KD-55AF9")])
        .is_some());
}

#[test]
fn test_removing_product_with_its_orders_is_accepted() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .remove(&mut txn, STORE_PRODUCTS, vec![Value::from("SN-KD-55AF9")])
        .unwrap();
    for id in [1, 2] {
        datastore
            .remove(&mut txn, STORE_ORDERS, vec![Value::from(id)])
            .unwrap();
    }
    datastore.commit(txn).unwrap();

    let counts = datastore.head().row_counts();
    assert_eq!(counts[STORE_PRODUCTS], 3);
    assert_eq!(counts[STORE_ORDERS], 6);
}

/// A product and the order that needs it can arrive together.
#[test]
fn test_reference_resolved_within_transaction() {
    let datastore = loaded();
    let mut txn = datastore.begin_transaction();
    datastore
        .add(&mut txn, STORE_ORDERS, order(100, "NEW-1", 10.0))
        .unwrap();
    datastore
        .add(
            &mut txn,
            STORE_PRODUCTS,
            vec![
                Value::from("NEW-1"),
                Value::from("New Gadget"),
                Value::from("High Tech"),
                Value::from("Gadget"),
            ],
        )
        .unwrap();
    assert!(datastore.commit(txn).is_ok());
}

// =============================================================================
// Snapshot Immutability Tests
// =============================================================================

#[test]
fn test_old_snapshot_unchanged_by_later_commits() {
    let datastore = loaded();
    let old = datastore.head();
    let old_copy = (*old).clone();

    let mut txn = datastore.begin_transaction();
    datastore
        .remove(&mut txn, STORE_ORDERS, vec![Value::from(11)])
        .unwrap();
    datastore
        .put(&mut txn, STORE_ORDERS, order(12, "DELL-XPS15-9570", 1.0))
        .unwrap();
    datastore.commit(txn).unwrap();

    assert_eq!(*old, old_copy);
    assert_eq!(old.version(), Version::new(2));
    assert!(old.lookup(STORE_ORDERS, &[Value::from(11)]).is_some());
}

/// Stores a commit does not touch are shared with the previous snapshot.
#[test]
fn test_untouched_store_is_shared() {
    let datastore = loaded();
    let old = datastore.head();

    let mut txn = datastore.begin_transaction();
    datastore
        .add(&mut txn, STORE_ORDERS, order(100, "SN-KD-55AF9", 10.0))
        .unwrap();
    datastore.commit(txn).unwrap();

    let new = datastore.head();
    assert!(std::ptr::eq(
        old.store(STORE_PRODUCTS).unwrap(),
        new.store(STORE_PRODUCTS).unwrap()
    ));
    assert!(!std::ptr::eq(
        old.store(STORE_ORDERS).unwrap(),
        new.store(STORE_ORDERS).unwrap()
    ));
}
