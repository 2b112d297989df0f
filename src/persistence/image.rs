//! Snapshot images
//!
//! An image is one head snapshot written as a single JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "created_at": "2026-10-18T09:30:00+00:00",
//!   "version": 2,
//!   "schema": { "stores": [...], "references": [...] },
//!   "stores": { "Orders": [[...], ...], "Products": [[...], ...] },
//!   "checksum": "crc32:1a2b3c4d"
//! }
//! ```
//!
//! The checksum covers every other field. Restoring replays the rows as one
//! transaction, so the restored datastore checks keys and references like
//! any other load.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::datastore::{Datastore, DatastoreOptions, Snapshot, Version};
use crate::observability::{log_event, Event};
use crate::schema::{Row, SchemaDescription};

use super::checksum::{compute_checksum, format_checksum};
use super::errors::{PersistenceError, PersistenceResult};

pub const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotImage {
    pub format_version: u8,
    /// RFC3339 creation time
    pub created_at: String,
    pub version: Version,
    pub schema: SchemaDescription,
    /// Rows per store, in key order
    pub stores: BTreeMap<String, Vec<Row>>,
    pub checksum: String,
}

/// Everything the checksum covers
#[derive(Serialize)]
struct ChecksumPayload<'a> {
    format_version: u8,
    created_at: &'a str,
    version: Version,
    schema: &'a SchemaDescription,
    stores: &'a BTreeMap<String, Vec<Row>>,
}

impl SnapshotImage {
    /// Captures a snapshot
    pub fn capture(snapshot: &Snapshot) -> PersistenceResult<Self> {
        let stores: BTreeMap<String, Vec<Row>> = snapshot
            .schema()
            .stores
            .iter()
            .map(|store| {
                let rows = snapshot
                    .store(&store.name)
                    .map(|rows| rows.rows().cloned().collect::<Vec<Row>>())
                    .unwrap_or_default();
                (store.name.clone(), rows)
            })
            .collect();

        let mut image = Self {
            format_version: FORMAT_VERSION,
            created_at: Utc::now().to_rfc3339(),
            version: snapshot.version(),
            schema: snapshot.schema().clone(),
            stores,
            checksum: String::new(),
        };
        image.checksum = image.compute_checksum()?;
        Ok(image)
    }

    fn compute_checksum(&self) -> PersistenceResult<String> {
        let payload = ChecksumPayload {
            format_version: self.format_version,
            created_at: &self.created_at,
            version: self.version,
            schema: &self.schema,
            stores: &self.stores,
        };
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| PersistenceError::Malformed(format!("cannot encode image: {}", e)))?;
        Ok(format_checksum(compute_checksum(&bytes)))
    }

    /// Checks the format version and the checksum
    pub fn verify(&self) -> PersistenceResult<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedFormat {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let computed = self.compute_checksum()?;
        if computed != self.checksum {
            return Err(PersistenceError::ChecksumMismatch {
                recorded: self.checksum.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.stores.values().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> PersistenceResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PersistenceError::Malformed(format!("cannot encode image: {}", e)))
    }

    /// Parses and verifies an image
    pub fn from_json(json: &str) -> PersistenceResult<Self> {
        let image: SnapshotImage = serde_json::from_str(json)
            .map_err(|e| PersistenceError::Malformed(format!("cannot parse image: {}", e)))?;
        image.verify()?;
        Ok(image)
    }

    /// Writes the image and syncs the file
    pub fn write_to_file(&self, path: &Path) -> PersistenceResult<()> {
        let json = self.to_json()?;
        let mut file = File::create(path).map_err(|e| PersistenceError::io(path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| PersistenceError::io(path, e))?;
        file.sync_all().map_err(|e| PersistenceError::io(path, e))?;

        let version = self.version.to_string();
        let rows = self.row_count().to_string();
        let path_str = path.display().to_string();
        log_event(
            Event::ImageWritten,
            &[
                ("path", &path_str),
                ("version", &version),
                ("rows", &rows),
                ("checksum", &self.checksum),
            ],
        );
        Ok(())
    }

    pub fn read_from_file(path: &Path) -> PersistenceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        Self::from_json(&content)
    }

    /// Builds a datastore whose head equals this image.
    ///
    /// All rows are replayed in one transaction committed as the image's
    /// version. An image of version 0 restores an empty datastore.
    pub fn restore(&self, options: DatastoreOptions) -> PersistenceResult<Datastore> {
        self.verify()?;
        let initial = self.version.value().saturating_sub(1);
        let options = DatastoreOptions {
            initial_version: Version::new(initial),
            ..options
        };
        let datastore = Datastore::with_options(self.schema.clone(), options)?;

        if self.version != Version::INITIAL {
            let mut txn = datastore.begin_transaction();
            for (store, rows) in &self.stores {
                for row in rows {
                    datastore.add(&mut txn, store, row.clone())?;
                }
            }
            datastore.commit(txn)?;
        }

        let version = datastore.head().version().to_string();
        let rows = self.row_count().to_string();
        log_event(Event::ImageRestored, &[("version", &version), ("rows", &rows)]);
        Ok(datastore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescription, FieldType, StoreDescription, Value};
    use tempfile::TempDir;

    fn datastore() -> Datastore {
        let schema = SchemaDescription::new(
            vec![StoreDescription::new(
                "Products",
                vec![
                    FieldDescription::key("id", FieldType::String),
                    FieldDescription::new("price", FieldType::Double),
                ],
            )],
            vec![],
        );
        let store = Datastore::new(schema).unwrap();
        let mut txn = store.begin_transaction();
        store
            .add(&mut txn, "Products", vec![Value::from("P1"), Value::from(9.5)])
            .unwrap();
        store.commit(txn).unwrap();
        store
    }

    #[test]
    fn test_capture_has_valid_checksum() {
        let image = SnapshotImage::capture(&datastore().head()).unwrap();
        assert!(image.checksum.starts_with("crc32:"));
        assert!(image.verify().is_ok());
        assert_eq!(image.row_count(), 1);
    }

    #[test]
    fn test_tampered_image_is_rejected() {
        let mut image = SnapshotImage::capture(&datastore().head()).unwrap();
        image.stores.get_mut("Products").unwrap()[0][1] = Value::from(1.0);
        let err = image.verify().unwrap_err();
        assert!(matches!(err, PersistenceError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_unsupported_format() {
        let mut image = SnapshotImage::capture(&datastore().head()).unwrap();
        image.format_version = 9;
        assert!(matches!(
            image.verify(),
            Err(PersistenceError::UnsupportedFormat { found: 9, .. })
        ));
    }

    #[test]
    fn test_file_round_trip_restores_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.json");
        let original = datastore();

        SnapshotImage::capture(&original.head())
            .unwrap()
            .write_to_file(&path)
            .unwrap();
        let restored = SnapshotImage::read_from_file(&path)
            .unwrap()
            .restore(DatastoreOptions::default())
            .unwrap();

        assert_eq!(restored.head().version(), original.head().version());
        assert_eq!(*restored.head(), *original.head());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotImage::read_from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }
}
