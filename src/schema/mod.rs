//! Schema model
//!
//! Typed description of stores, fields, key fields and the references
//! between stores.
//!
//! # Design Principles
//!
//! - Descriptions are plain immutable data
//! - `validate` is pure and runs before any datastore is built
//! - Every store has a primary key; references always target a full key
//! - Rows are checked against their store when staged, not at commit

mod errors;
mod types;
mod validator;
mod value;

pub use errors::{RowViolation, SchemaError, SchemaResult};
pub use types::{
    FieldDescription, FieldMapping, FieldType, ReferenceDescription, SchemaDescription,
    StoreDescription,
};
pub use validator::SchemaValidator;
pub use value::{render_key, Key, Row, Value};

/// Validates a schema description.
///
/// # Errors
///
/// Returns the first `SchemaError` found in the description.
pub fn validate(schema: &SchemaDescription) -> SchemaResult<()> {
    SchemaValidator::new(schema).validate()
}
