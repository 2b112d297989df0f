//! Schema validation
//!
//! Validation semantics:
//! - Store names are unique, field names are unique within a store
//! - Every store has at least one key field and key fields are not nullable
//! - Reference names are unique and their stores and fields exist
//! - Mapped fields have identical types
//! - The mapped target fields are exactly the target store's key
//! - No reference maps a store's key onto itself
//!
//! Validation is pure: the description is never modified and the first
//! violation found is reported.
//!
//! The same validator checks rows staged into a datastore; staged doubles
//! must be finite.

use std::collections::HashSet;

use super::errors::{RowViolation, SchemaError, SchemaResult};
use super::types::{FieldDescription, ReferenceDescription, SchemaDescription, StoreDescription};
use super::value::{Key, Row, Value};

/// Validates a schema description and rows written against it.
pub struct SchemaValidator<'a> {
    schema: &'a SchemaDescription,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a SchemaDescription) -> Self {
        Self { schema }
    }

    /// Validates the whole description.
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaError` found, stores first, then references
    /// in declaration order.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut store_names = HashSet::new();
        for store in &self.schema.stores {
            if !store_names.insert(store.name.as_str()) {
                return Err(SchemaError::DuplicateStore {
                    store: store.name.clone(),
                });
            }
            self.validate_store(store)?;
        }

        let mut reference_names = HashSet::new();
        for reference in &self.schema.references {
            if !reference_names.insert(reference.name.as_str()) {
                return Err(SchemaError::DuplicateReference {
                    reference: reference.name.clone(),
                });
            }
            self.validate_reference(reference)?;
        }

        Ok(())
    }

    fn validate_store(&self, store: &StoreDescription) -> SchemaResult<()> {
        let mut field_names = HashSet::new();
        for field in &store.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    store: store.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.is_key && field.nullable {
                return Err(SchemaError::NullableKey {
                    store: store.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        if store.key_fields().next().is_none() {
            return Err(SchemaError::MissingKey {
                store: store.name.clone(),
            });
        }

        Ok(())
    }

    fn validate_reference(&self, reference: &ReferenceDescription) -> SchemaResult<()> {
        let from = self.schema.store(&reference.from_store).ok_or_else(|| {
            SchemaError::UnknownStore {
                reference: reference.name.clone(),
                store: reference.from_store.clone(),
            }
        })?;
        let to = self.schema.store(&reference.to_store).ok_or_else(|| {
            SchemaError::UnknownStore {
                reference: reference.name.clone(),
                store: reference.to_store.clone(),
            }
        })?;

        if reference.mapping.is_empty() {
            return Err(SchemaError::KeyMismatch {
                reference: reference.name.clone(),
                store: to.name.clone(),
                detail: "no field mapping declared".into(),
            });
        }

        let mut mapped_targets = HashSet::new();
        for mapping in &reference.mapping {
            let from_field = from.field(&mapping.from).ok_or_else(|| SchemaError::UnknownField {
                reference: reference.name.clone(),
                store: from.name.clone(),
                field: mapping.from.clone(),
            })?;
            let to_field = to.field(&mapping.to).ok_or_else(|| SchemaError::UnknownField {
                reference: reference.name.clone(),
                store: to.name.clone(),
                field: mapping.to.clone(),
            })?;

            if from_field.field_type != to_field.field_type {
                return Err(SchemaError::TypeMismatch {
                    reference: reference.name.clone(),
                    from_field: from_field.name.clone(),
                    from_type: from_field.field_type.type_name().into(),
                    to_field: to_field.name.clone(),
                    to_type: to_field.field_type.type_name().into(),
                });
            }

            if !to_field.is_key {
                return Err(SchemaError::KeyMismatch {
                    reference: reference.name.clone(),
                    store: to.name.clone(),
                    detail: format!("'{}' is not a key field", to_field.name),
                });
            }

            if !mapped_targets.insert(to_field.name.as_str()) {
                return Err(SchemaError::KeyMismatch {
                    reference: reference.name.clone(),
                    store: to.name.clone(),
                    detail: format!("key field '{}' is mapped twice", to_field.name),
                });
            }
        }

        if let Some(missing) = to.key_fields().find(|k| !mapped_targets.contains(k.name.as_str())) {
            return Err(SchemaError::KeyMismatch {
                reference: reference.name.clone(),
                store: to.name.clone(),
                detail: format!("key field '{}' is not mapped", missing.name),
            });
        }

        if from.name == to.name && reference.mapping.iter().all(|m| m.from == m.to) {
            return Err(SchemaError::SelfReference {
                reference: reference.name.clone(),
                store: from.name.clone(),
            });
        }

        Ok(())
    }

    /// Checks a row against a store and returns it with values coerced to
    /// the declared field types.
    pub fn validate_row(&self, store: &StoreDescription, row: Row) -> Result<Row, RowViolation> {
        if row.len() != store.arity() {
            return Err(RowViolation::arity(store.arity(), row.len()));
        }

        store
            .fields
            .iter()
            .zip(row)
            .map(|(field, value)| {
                if value.is_null() && !field.nullable {
                    return Err(RowViolation::null_value(&field.name));
                }
                coerce_field(field, value)
            })
            .collect()
    }

    /// Checks a primary key against a store's key fields.
    pub fn validate_key(&self, store: &StoreDescription, key: Key) -> Result<Key, RowViolation> {
        let key_fields: Vec<_> = store.key_fields().collect();
        if key.len() != key_fields.len() {
            return Err(RowViolation::new(
                "$key",
                format!("{} key values", key_fields.len()),
                format!("{} key values", key.len()),
            ));
        }

        key_fields
            .into_iter()
            .zip(key)
            .map(|(field, value)| {
                if value.is_null() {
                    return Err(RowViolation::null_value(&field.name));
                }
                coerce_field(field, value)
            })
            .collect()
    }
}

/// Coerces one value to its field's type. Doubles must be finite.
fn coerce_field(field: &FieldDescription, value: Value) -> Result<Value, RowViolation> {
    match field.field_type.coerce(value) {
        Ok(Value::Double(d)) if !d.is_finite() => Err(RowViolation::non_finite(&field.name, d)),
        Ok(value) => Ok(value),
        Err(actual) => Err(RowViolation::new(
            &field.name,
            field.field_type.type_name(),
            actual.type_name(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescription, FieldType};

    fn orders() -> StoreDescription {
        StoreDescription::new(
            "Orders",
            vec![
                FieldDescription::key("id", FieldType::Int),
                FieldDescription::new("productId", FieldType::String),
                FieldDescription::new("sales", FieldType::Double),
                FieldDescription::nullable("comment", FieldType::String),
            ],
        )
    }

    fn products() -> StoreDescription {
        StoreDescription::new(
            "Products",
            vec![
                FieldDescription::key("id", FieldType::String),
                FieldDescription::new("category", FieldType::String),
            ],
        )
    }

    fn order_to_product() -> ReferenceDescription {
        ReferenceDescription::new("orderToProduct", "Orders", "Products").with_mapping("productId", "id")
    }

    #[test]
    fn test_valid_schema() {
        let schema = SchemaDescription::new(vec![orders(), products()], vec![order_to_product()]);
        assert!(SchemaValidator::new(&schema).validate().is_ok());
    }

    #[test]
    fn test_duplicate_field() {
        let store = StoreDescription::new(
            "S",
            vec![
                FieldDescription::key("id", FieldType::Int),
                FieldDescription::new("id", FieldType::String),
            ],
        );
        let schema = SchemaDescription::new(vec![store], vec![]);
        assert!(matches!(
            SchemaValidator::new(&schema).validate(),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_store_without_key() {
        let store = StoreDescription::new("S", vec![FieldDescription::new("x", FieldType::Int)]);
        let schema = SchemaDescription::new(vec![store], vec![]);
        assert!(matches!(
            SchemaValidator::new(&schema).validate(),
            Err(SchemaError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_reference_to_non_key_field() {
        let reference =
            ReferenceDescription::new("bad", "Orders", "Products").with_mapping("productId", "category");
        let schema = SchemaDescription::new(vec![orders(), products()], vec![reference]);
        assert!(matches!(
            SchemaValidator::new(&schema).validate(),
            Err(SchemaError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_reference_type_mismatch() {
        let reference = ReferenceDescription::new("bad", "Orders", "Products").with_mapping("sales", "id");
        let schema = SchemaDescription::new(vec![orders(), products()], vec![reference]);
        assert!(matches!(
            SchemaValidator::new(&schema).validate(),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_identity_self_reference() {
        let reference = ReferenceDescription::new("loop", "Orders", "Orders").with_mapping("id", "id");
        let schema = SchemaDescription::new(vec![orders()], vec![reference]);
        assert!(matches!(
            SchemaValidator::new(&schema).validate(),
            Err(SchemaError::SelfReference { .. })
        ));
    }

    #[test]
    fn test_row_coercion_and_nulls() {
        let schema = SchemaDescription::new(vec![orders()], vec![]);
        let validator = SchemaValidator::new(&schema);
        let store = schema.store("Orders").unwrap();

        let row = validator
            .validate_row(store, vec![1.into(), "P".into(), 2790.into(), Value::Null])
            .unwrap();
        assert_eq!(row[2], Value::Double(2790.0));

        let err = validator
            .validate_row(store, vec![1.into(), Value::Null, 1.0.into(), Value::Null])
            .unwrap_err();
        assert_eq!(err.field, "productId");

        let err = validator.validate_row(store, vec![1.into()]).unwrap_err();
        assert_eq!(err.field, "$row");
    }

    #[test]
    fn test_non_finite_doubles_are_rejected() {
        let schema = SchemaDescription::new(vec![orders()], vec![]);
        let validator = SchemaValidator::new(&schema);
        let store = schema.store("Orders").unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = validator
                .validate_row(store, vec![1.into(), "P".into(), bad.into(), Value::Null])
                .unwrap_err();
            assert_eq!(err.field, "sales");
            assert_eq!(err.expected, "finite double");
        }
    }

    #[test]
    fn test_key_validation() {
        let schema = SchemaDescription::new(vec![orders()], vec![]);
        let validator = SchemaValidator::new(&schema);
        let store = schema.store("Orders").unwrap();

        assert!(validator.validate_key(store, vec![Value::from(1)]).is_ok());
        assert!(validator.validate_key(store, vec![Value::from("1")]).is_err());
        assert!(validator.validate_key(store, vec![]).is_err());
    }
}
