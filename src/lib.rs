//! nanopivot - an in-memory multidimensional analysis engine
//!
//! A transactional multi-store datastore, a denormalizing selection over it,
//! a cube of dimensions, hierarchies, levels and measures, and an
//! aggregation engine evaluating queries against immutable snapshots.

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod cube;
pub mod datastore;
pub mod error;
pub mod manager;
pub mod observability;
pub mod persistence;
pub mod sample;
pub mod schema;
pub mod selection;

mod cache;

pub use error::{ErrorCode, Severity};
