//! NanoPivot sample application
//!
//! Orders of consumer electronics, each referencing a product:
//!
//! - `Orders(id*, date, country, productId, quantity, sales)`
//! - `Products(id*, name, category, subCategory)`
//! - `orderToProduct: Orders.productId -> Products.id`
//!
//! The cube groups orders by product (flat or by category), country and
//! order date, and measures order count, total and average sales.

use thiserror::Error;

use crate::cube::{
    CubeDescription, DimensionDescription, HierarchyDescription, LevelDescription,
    MeasureDescription,
};
use crate::datastore::{CommitError, Datastore, Snapshot, StageError, Version};
use crate::error::{ErrorCode, Severity};
use crate::observability::{log_event, Event, Timer};
use crate::schema::{
    render_key, FieldDescription, FieldType, ReferenceDescription, Row, SchemaDescription,
    StoreDescription, Value,
};

pub const STORE_ORDERS: &str = "Orders";
pub const STORE_PRODUCTS: &str = "Products";
pub const REFERENCE_ORDER_TO_PRODUCT: &str = "orderToProduct";

pub const MANAGER_NAME: &str = "NanoPivot";
pub const CATALOG_NAME: &str = "NanoPivot Catalog";
pub const SCHEMA_NAME: &str = "NanoPivot Schema";
pub const CUBE_NAME: &str = "NanoPivot";

pub const DATE_FORMATTER: &str = "DATE[yyyy-MM-dd]";
pub const DOUBLE_FORMATTER_ONE_DECIMAL: &str = "DOUBLE[##.#]";

pub const MEASURE_ORDER_COUNT: &str = "Order Count";
pub const MEASURE_SUM_OF_SALES: &str = "Sum of Sales";
pub const MEASURE_AVERAGE_SALES: &str = "Average Sales";

pub fn schema() -> SchemaDescription {
    SchemaDescription::new(
        vec![
            StoreDescription::new(
                STORE_ORDERS,
                vec![
                    FieldDescription::key("id", FieldType::Int),
                    FieldDescription::new("date", FieldType::Date),
                    FieldDescription::new("country", FieldType::String),
                    FieldDescription::new("productId", FieldType::String),
                    FieldDescription::new("quantity", FieldType::Int),
                    FieldDescription::new("sales", FieldType::Double),
                ],
            ),
            StoreDescription::new(
                STORE_PRODUCTS,
                vec![
                    FieldDescription::key("id", FieldType::String),
                    FieldDescription::new("name", FieldType::String),
                    FieldDescription::new("category", FieldType::String),
                    FieldDescription::new("subCategory", FieldType::String),
                ],
            ),
        ],
        vec![
            ReferenceDescription::new(REFERENCE_ORDER_TO_PRODUCT, STORE_ORDERS, STORE_PRODUCTS)
                .with_mapping("productId", "id"),
        ],
    )
}

pub fn cube_description() -> CubeDescription {
    CubeDescription::new(
        CUBE_NAME,
        vec![
            DimensionDescription::new(
                "Product",
                vec![
                    HierarchyDescription::new("Product", vec![LevelDescription::of_column("name")]),
                    HierarchyDescription::new(
                        "Category",
                        vec![
                            LevelDescription::of_column("category"),
                            LevelDescription::of_column("subCategory"),
                            LevelDescription::of_column("name"),
                        ],
                    ),
                ],
            ),
            DimensionDescription::new(
                "Geography",
                vec![HierarchyDescription::single_level("country")],
            ),
            DimensionDescription::new(
                "OrderDate",
                vec![HierarchyDescription::new(
                    "OrderDate",
                    vec![LevelDescription::of_column("date")
                        .time()
                        .with_formatter(DATE_FORMATTER)],
                )],
            ),
        ],
        vec![
            MeasureDescription::count(MEASURE_ORDER_COUNT),
            MeasureDescription::sum(MEASURE_SUM_OF_SALES, "sales")
                .with_formatter(DOUBLE_FORMATTER_ONE_DECIMAL),
            MeasureDescription::average(MEASURE_AVERAGE_SALES, "sales")
                .with_formatter(DOUBLE_FORMATTER_ONE_DECIMAL),
        ],
    )
}

fn product(id: &str, name: &str, category: &str, sub_category: &str) -> Row {
    vec![
        Value::from(id),
        Value::from(name),
        Value::from(category),
        Value::from(sub_category),
    ]
}

fn order(id: i64, date: Value, country: &str, product_id: &str, quantity: i64, sales: f64) -> Row {
    vec![
        Value::from(id),
        date,
        Value::from(country),
        Value::from(product_id),
        Value::from(quantity),
        Value::from(sales),
    ]
}

/// Televisions and their orders
pub fn tv_rows() -> (Vec<Row>, Vec<Row>) {
    (
        vec![
            product("SN-KD-55AF9", "Sony OLED 4K KD-55AF9", "High Tech", "TV"),
            product("LG-49SK8500", "LG SUPER UHD NanoCell 49in", "High Tech", "TV"),
        ],
        vec![
            order(1, Value::date(2018, 12, 10), "France", "SN-KD-55AF9", 1, 2790.0),
            order(2, Value::date(2018, 12, 20), "Spain", "SN-KD-55AF9", 2, 4890.0),
            order(3, Value::date(2019, 1, 10), "France", "LG-49SK8500", 1, 1499.0),
            order(4, Value::date(2019, 1, 14), "Spain", "LG-49SK8500", 3, 4190.0),
        ],
    )
}

/// Laptops and their orders
pub fn computer_rows() -> (Vec<Row>, Vec<Row>) {
    (
        vec![
            product("DELL-XPS15-9570", "Dell Laptop XPS 15-9570", "High Tech", "Computer"),
            product("HP-ENVY-13-AH0002NF", "HP Laptop Envy 13.3in", "High Tech", "Computer"),
        ],
        vec![
            order(11, Value::date(2018, 12, 10), "Spain", "DELL-XPS15-9570", 1, 2210.0),
            order(12, Value::date(2018, 12, 14), "France", "DELL-XPS15-9570", 2, 4090.0),
            order(13, Value::date(2019, 1, 8), "France", "HP-ENVY-13-AH0002NF", 1, 949.0),
            order(14, Value::date(2019, 2, 2), "Spain", "HP-ENVY-13-AH0002NF", 1, 919.0),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("sample row rejected: {0}")]
    Stage(#[from] StageError),

    #[error("sample transaction rejected: {0}")]
    Commit(#[from] CommitError),
}

impl ErrorCode for LoadError {
    fn code(&self) -> &'static str {
        match self {
            LoadError::Stage(err) => err.code(),
            LoadError::Commit(err) => err.code(),
        }
    }

    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Loads the sample data in two transactions, one per product family.
///
/// Returns the version of the last commit.
pub fn load(datastore: &Datastore) -> Result<Version, LoadError> {
    let timer = Timer::new();
    let mut version = datastore.head().version();
    for (products, orders) in [tv_rows(), computer_rows()] {
        let mut txn = datastore.begin_transaction();
        for row in products {
            datastore.add(&mut txn, STORE_PRODUCTS, row)?;
        }
        for row in orders {
            datastore.add(&mut txn, STORE_ORDERS, row)?;
        }
        version = datastore.commit(txn)?;
    }

    let head = datastore.head();
    let rows = head.total_rows().to_string();
    let version_str = version.to_string();
    log_event(
        Event::DataLoadComplete,
        &[
            ("version", &version_str),
            ("rows", &rows),
            ("elapsed_ms", &timer.elapsed_ms()),
        ],
    );
    for (store, count) in head.row_counts() {
        let count = count.to_string();
        log_event(Event::StoreSize, &[("store", &store), ("rows", &count)]);
    }
    Ok(version)
}

/// Human-readable listing of stores, fields and references
pub fn describe_structure(schema: &SchemaDescription) -> String {
    let mut out = String::new();
    for store in &schema.stores {
        out.push_str(&format!("Store {}\n", store.name));
        for field in &store.fields {
            let marker = if field.is_key { " [key]" } else { "" };
            let nullable = if field.nullable { " nullable" } else { "" };
            out.push_str(&format!(
                "  {}: {}{}{}\n",
                field.name,
                field.field_type.type_name(),
                nullable,
                marker
            ));
        }
    }
    for reference in &schema.references {
        let mapping: Vec<String> = reference
            .mapping
            .iter()
            .map(|m| format!("{} -> {}", m.from, m.to))
            .collect();
        out.push_str(&format!(
            "Reference {}: {} -> {} ({})\n",
            reference.name,
            reference.from_store,
            reference.to_store,
            mapping.join(", ")
        ));
    }
    out
}

/// Every row of every store of a snapshot, in store then key order
pub fn describe_contents(snapshot: &Snapshot) -> String {
    let mut out = format!("Version {}\n", snapshot.version());
    for store in &snapshot.schema().stores {
        let Some(rows) = snapshot.store(&store.name) else {
            continue;
        };
        let names: Vec<&str> = store.fields.iter().map(|f| f.name.as_str()).collect();
        out.push_str(&format!(
            "Store {} ({} rows) [{}]\n",
            store.name,
            rows.len(),
            names.join(", ")
        ));
        for row in rows.rows() {
            out.push_str(&format!("  {}\n", render_key(row)));
        }
    }
    out
}
