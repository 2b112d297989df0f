//! Aggregation engine
//!
//! Count, sum, average, min, max and registered custom reductions over a
//! fact view, grouped by cube levels and filtered by member sets.
//!
//! # Determinism
//!
//! A fixed snapshot and query always produce the same result: groups are
//! ordered by coordinate, custom reductions see values in fact-row order,
//! and the grand total is the merge of every group.

mod accumulator;
mod engine;
mod errors;
mod query;
mod registry;
mod result;

pub use engine::{AggregationEngine, EngineOptions, NullPolicy};
pub use errors::{QueryError, QueryResult};
pub use query::Query;
pub use registry::{Reduction, ReductionRegistry};
pub use result::{
    MultidimensionalResult, PartialDataWarning, RenderedResult, RenderedRow, ResultCell,
};
