//! Schema description types
//!
//! Stores, their fields and the references between stores. These are plain
//! immutable descriptions; `validate` checks them before a datastore is
//! built from them.

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Semantic type of a store field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Double,
    /// UTF-8 string
    String,
    /// Calendar date
    Date,
    /// Boolean
    Bool,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Bool => "bool",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Double)
    }

    /// Parses a textual value of this type. Dates use `YYYY-MM-DD`.
    pub fn parse_value(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        match self {
            FieldType::Int => text.parse().ok().map(Value::Int),
            FieldType::Double => text
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(Value::Double),
            FieldType::String => Some(Value::String(text.to_string())),
            FieldType::Date => chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            FieldType::Bool => text.parse().ok().map(Value::Bool),
        }
    }

    /// Converts a value into this type when it is compatible.
    ///
    /// Integers widen to doubles; nothing else is coerced. `Null` passes
    /// through unchanged; nullability is checked by the caller.
    pub fn coerce(&self, value: Value) -> Result<Value, Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::Int, v @ Value::Int(_)) => Ok(v),
            (FieldType::Double, v @ Value::Double(_)) => Ok(v),
            (FieldType::Double, Value::Int(i)) => Ok(Value::Double(i as f64)),
            (FieldType::String, v @ Value::String(_)) => Ok(v),
            (FieldType::Date, v @ Value::Date(_)) => Ok(v),
            (FieldType::Bool, v @ Value::Bool(_)) => Ok(v),
            (_, other) => Err(other),
        }
    }
}

/// A single field of a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Part of the store's primary key
    #[serde(default)]
    pub is_key: bool,
    /// Whether `Null` is accepted
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDescription {
    /// A key field
    pub fn key(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_key: true,
            nullable: false,
        }
    }

    /// A non-key, non-nullable field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_key: false,
            nullable: false,
        }
    }

    /// A non-key field accepting `Null`
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_key: false,
            nullable: true,
        }
    }
}

/// A named collection of uniquely keyed rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDescription {
    pub name: String,
    pub fields: Vec<FieldDescription>,
}

impl StoreDescription {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescription>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Number of fields in a row of this store
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Positions of the key fields, in declaration order
    pub fn key_indices(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_key)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDescription> {
        self.fields.iter().filter(|f| f.is_key)
    }

    /// Extracts the primary key of a row
    pub fn key_of(&self, row: &[Value]) -> Vec<Value> {
        self.fields
            .iter()
            .zip(row)
            .filter(|(f, _)| f.is_key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// One `from_field -> to_field` pair of a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub from: String,
    pub to: String,
}

/// A foreign-key relationship from one store to another store's key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescription {
    pub name: String,
    pub from_store: String,
    pub to_store: String,
    pub mapping: Vec<FieldMapping>,
}

impl ReferenceDescription {
    pub fn new(
        name: impl Into<String>,
        from_store: impl Into<String>,
        to_store: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_store: from_store.into(),
            to_store: to_store.into(),
            mapping: Vec::new(),
        }
    }

    /// Adds a field mapping
    pub fn with_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mapping.push(FieldMapping {
            from: from.into(),
            to: to.into(),
        });
        self
    }
}

/// Stores plus the reference graph between them
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub stores: Vec<StoreDescription>,
    #[serde(default)]
    pub references: Vec<ReferenceDescription>,
}

impl SchemaDescription {
    pub fn new(stores: Vec<StoreDescription>, references: Vec<ReferenceDescription>) -> Self {
        Self { stores, references }
    }

    pub fn store(&self, name: &str) -> Option<&StoreDescription> {
        self.stores.iter().find(|s| s.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceDescription> {
        self.references.iter().find(|r| r.name == name)
    }

    /// Outgoing references of a store, in declaration order
    pub fn references_from<'a>(
        &'a self,
        store: &'a str,
    ) -> impl Iterator<Item = &'a ReferenceDescription> + 'a {
        self.references.iter().filter(move |r| r.from_store == store)
    }

    /// Positions in the source row that produce the target key.
    ///
    /// The result is ordered like the target store's key fields, so the
    /// values at these positions form a key directly usable for lookup.
    /// `None` when the reference does not resolve against this schema.
    pub fn source_key_indices(&self, reference: &ReferenceDescription) -> Option<Vec<usize>> {
        let from = self.store(&reference.from_store)?;
        let to = self.store(&reference.to_store)?;
        to.key_fields()
            .map(|key_field| {
                let mapping = reference.mapping.iter().find(|m| m.to == key_field.name)?;
                from.field_index(&mapping.from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products() -> StoreDescription {
        StoreDescription::new(
            "Products",
            vec![
                FieldDescription::key("id", FieldType::String),
                FieldDescription::new("name", FieldType::String),
            ],
        )
    }

    #[test]
    fn test_key_indices() {
        let store = StoreDescription::new(
            "Lines",
            vec![
                FieldDescription::new("qty", FieldType::Int),
                FieldDescription::key("order", FieldType::Int),
                FieldDescription::key("line", FieldType::Int),
            ],
        );
        assert_eq!(store.key_indices(), vec![1, 2]);
        assert_eq!(
            store.key_of(&[Value::from(5), Value::from(1), Value::from(2)]),
            vec![Value::from(1), Value::from(2)]
        );
    }

    #[test]
    fn test_int_widens_to_double() {
        assert_eq!(FieldType::Double.coerce(Value::Int(2790)), Ok(Value::Double(2790.0)));
        assert!(FieldType::Int.coerce(Value::Double(1.5)).is_err());
        assert!(FieldType::String.coerce(Value::Int(1)).is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(FieldType::Date.parse_value("2019-01-10"), Some(Value::date(2019, 1, 10)));
        assert_eq!(FieldType::Int.parse_value(" 42 "), Some(Value::Int(42)));
        assert_eq!(FieldType::Double.parse_value("x"), None);
        assert_eq!(FieldType::Double.parse_value("NaN"), None);
        assert_eq!(FieldType::Double.parse_value("inf"), None);
        assert_eq!(FieldType::String.parse_value("TV"), Some(Value::from("TV")));
    }

    #[test]
    fn test_source_key_indices() {
        let orders = StoreDescription::new(
            "Orders",
            vec![
                FieldDescription::key("id", FieldType::Int),
                FieldDescription::new("productId", FieldType::String),
            ],
        );
        let reference = ReferenceDescription::new("orderToProduct", "Orders", "Products")
            .with_mapping("productId", "id");
        let schema = SchemaDescription::new(vec![orders, products()], vec![reference.clone()]);
        assert_eq!(schema.source_key_indices(&reference), Some(vec![1]));
    }

    #[test]
    fn test_field_type_serde_is_lowercase() {
        let json = serde_json::to_string(&FieldType::Double).unwrap();
        assert_eq!(json, "\"double\"");
    }
}
