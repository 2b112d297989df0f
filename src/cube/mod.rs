//! Cube model
//!
//! Dimensions own hierarchies, hierarchies own ordered levels (coarsest
//! first), and each level reads one fact view column. Measures name the
//! reductions the aggregation engine computes.
//!
//! A cube is built once from its description and never changes.

mod description;
mod errors;
mod format;
mod measure;
mod model;
mod navigation;
mod path;

pub use description::{
    CubeDescription, DimensionDescription, HierarchyDescription, LevelDescription, LevelType,
};
pub use errors::{CubeError, CubeResult};
pub use format::Formatter;
pub use measure::{AggregationKind, MeasureDescription};
pub use model::{build_cube, CubeModel, Dimension, Hierarchy, Level, Measure};
pub use navigation::{Member, Members};
pub use path::{HierarchyPath, LevelPath};
