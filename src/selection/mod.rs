//! Selection and fact view
//!
//! A `Selection` denormalizes a base store: each base row is extended with
//! the fields of every row it reaches through outgoing references. The
//! resulting `FactView` is what the cube navigates and aggregates.
//!
//! Materialization is pure: it reads one immutable snapshot and never
//! touches the datastore.

mod cache;
mod errors;
mod plan;
mod view;

pub use cache::FactViewCache;
pub use errors::{SelectionError, SelectionResult};
pub use plan::{build_selection, FactColumn, JoinStep, Selection};
pub use view::FactView;
