//! Schema Invariant Tests
//!
//! - Every store declares a non-nullable key
//! - References map exactly the full key of their target store
//! - Mapped fields have equal types
//! - Rows are checked against their store when staged
//! - Validation is deterministic

use nanopivot::datastore::{Datastore, StageError};
use nanopivot::schema::{
    validate, FieldDescription, FieldType, ReferenceDescription, SchemaDescription, SchemaError,
    StoreDescription, Value,
};
use nanopivot::ErrorCode;

// =============================================================================
// Helper Functions
// =============================================================================

fn products() -> StoreDescription {
    StoreDescription::new(
        "Products",
        vec![
            FieldDescription::key("id", FieldType::String),
            FieldDescription::new("name", FieldType::String),
            FieldDescription::nullable("price", FieldType::Double),
        ],
    )
}

fn orders(product_id_type: FieldType) -> StoreDescription {
    StoreDescription::new(
        "Orders",
        vec![
            FieldDescription::key("id", FieldType::Int),
            FieldDescription::new("productId", product_id_type),
            FieldDescription::new("quantity", FieldType::Int),
        ],
    )
}

fn order_to_product() -> ReferenceDescription {
    ReferenceDescription::new("orderToProduct", "Orders", "Products").with_mapping("productId", "id")
}

fn valid_schema() -> SchemaDescription {
    SchemaDescription::new(
        vec![orders(FieldType::String), products()],
        vec![order_to_product()],
    )
}

// =============================================================================
// Schema Validation Tests
// =============================================================================

/// A well-formed schema validates the same way every time.
#[test]
fn test_validation_is_deterministic() {
    let schema = valid_schema();
    for _ in 0..100 {
        assert!(validate(&schema).is_ok());
    }
}

#[test]
fn test_duplicate_store() {
    let schema = SchemaDescription::new(vec![products(), products()], vec![]);
    assert_eq!(
        validate(&schema),
        Err(SchemaError::DuplicateStore {
            store: "Products".to_string()
        })
    );
}

#[test]
fn test_store_without_key() {
    let schema = SchemaDescription::new(
        vec![StoreDescription::new(
            "Log",
            vec![FieldDescription::new("line", FieldType::String)],
        )],
        vec![],
    );
    let err = validate(&schema).unwrap_err();
    assert_eq!(err.code(), "NANO_SCHEMA_MISSING_KEY");
}

#[test]
fn test_reference_to_unknown_store() {
    let schema = SchemaDescription::new(vec![orders(FieldType::String)], vec![order_to_product()]);
    let err = validate(&schema).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownStore { ref store, .. } if store == "Products"));
}

#[test]
fn test_reference_must_target_the_key() {
    let schema = SchemaDescription::new(
        vec![orders(FieldType::String), products()],
        vec![ReferenceDescription::new("byName", "Orders", "Products").with_mapping("productId", "name")],
    );
    let err = validate(&schema).unwrap_err();
    assert_eq!(err.code(), "NANO_SCHEMA_KEY_MISMATCH");
}

#[test]
fn test_reference_types_must_match() {
    let schema = SchemaDescription::new(
        vec![orders(FieldType::Int), products()],
        vec![order_to_product()],
    );
    let err = validate(&schema).unwrap_err();
    assert_eq!(err.code(), "NANO_SCHEMA_TYPE_MISMATCH");
}

#[test]
fn test_invalid_schema_builds_no_datastore() {
    let schema = SchemaDescription::new(
        vec![orders(FieldType::Int), products()],
        vec![order_to_product()],
    );
    assert!(Datastore::new(schema).is_err());
}

#[test]
fn test_schema_errors_are_fatal() {
    let err = validate(&SchemaDescription::new(vec![products(), products()], vec![])).unwrap_err();
    assert_eq!(err.severity(), nanopivot::Severity::Fatal);
}

// =============================================================================
// Row Validation Tests
// =============================================================================

#[test]
fn test_row_with_wrong_arity_is_rejected() {
    let datastore = Datastore::new(valid_schema()).unwrap();
    let mut txn = datastore.begin_transaction();
    let err = datastore
        .add(&mut txn, "Products", vec![Value::from("P1")])
        .unwrap_err();
    assert!(matches!(err, StageError::SchemaViolation { ref store, .. } if store == "Products"));
    assert!(txn.is_empty());
}

#[test]
fn test_null_in_non_nullable_field_is_rejected() {
    let datastore = Datastore::new(valid_schema()).unwrap();
    let mut txn = datastore.begin_transaction();
    let err = datastore
        .add(
            &mut txn,
            "Products",
            vec![Value::from("P1"), Value::Null, Value::from(1.0)],
        )
        .unwrap_err();
    assert_eq!(err.code(), "NANO_STAGE_SCHEMA_VIOLATION");
}

#[test]
fn test_null_in_nullable_field_is_accepted() {
    let datastore = Datastore::new(valid_schema()).unwrap();
    let mut txn = datastore.begin_transaction();
    datastore
        .add(
            &mut txn,
            "Products",
            vec![Value::from("P1"), Value::from("Lamp"), Value::Null],
        )
        .unwrap();
    datastore.commit(txn).unwrap();
    let head = datastore.head();
    assert_eq!(head.lookup("Products", &[Value::from("P1")]).unwrap()[2], Value::Null);
}

#[test]
fn test_int_widens_to_double_field() {
    let datastore = Datastore::new(valid_schema()).unwrap();
    let mut txn = datastore.begin_transaction();
    datastore
        .add(
            &mut txn,
            "Products",
            vec![Value::from("P1"), Value::from("Lamp"), Value::from(12)],
        )
        .unwrap();
    datastore.commit(txn).unwrap();
    let head = datastore.head();
    assert_eq!(
        head.lookup("Products", &[Value::from("P1")]).unwrap()[2],
        Value::Double(12.0)
    );
}

#[test]
fn test_string_in_int_field_is_rejected() {
    let datastore = Datastore::new(valid_schema()).unwrap();
    let mut txn = datastore.begin_transaction();
    let err = datastore
        .add(
            &mut txn,
            "Orders",
            vec![Value::from(1), Value::from("P1"), Value::from("two")],
        )
        .unwrap_err();
    assert_eq!(err.code(), "NANO_STAGE_SCHEMA_VIOLATION");
}

#[test]
fn test_unknown_store_is_rejected() {
    let datastore = Datastore::new(valid_schema()).unwrap();
    let mut txn = datastore.begin_transaction();
    let err = datastore
        .add(&mut txn, "Customers", vec![Value::from(1)])
        .unwrap_err();
    assert_eq!(
        err,
        StageError::UnknownStore {
            store: "Customers".to_string()
        }
    );
}
