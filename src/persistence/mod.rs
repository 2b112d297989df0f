//! Snapshot export and import
//!
//! Datastore state lives for the process lifetime. A `SnapshotImage`
//! exports one head snapshot to a checksummed JSON file and restores it into
//! a fresh datastore.

mod checksum;
mod errors;
mod image;

pub use checksum::{compute_checksum, format_checksum, parse_checksum};
pub use errors::{PersistenceError, PersistenceResult};
pub use image::{SnapshotImage, FORMAT_VERSION};
