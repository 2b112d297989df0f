//! Cube descriptions
//!
//! Plain, serializable descriptions of dimensions, hierarchies, levels and
//! measures. `build_cube` checks them against a fact view's columns.

use serde::{Deserialize, Serialize};

use super::measure::MeasureDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelType {
    #[default]
    Standard,
    /// Members are calendar points, ordered chronologically
    Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDescription {
    pub name: String,
    /// Fact view column the level reads
    pub column: String,
    #[serde(default)]
    pub level_type: LevelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
}

impl LevelDescription {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            level_type: LevelType::Standard,
            formatter: None,
        }
    }

    /// A level named after its column
    pub fn of_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(column.clone(), column)
    }

    pub fn time(mut self) -> Self {
        self.level_type = LevelType::Time;
        self
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }
}

/// Ordered levels, coarsest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyDescription {
    pub name: String,
    pub levels: Vec<LevelDescription>,
}

impl HierarchyDescription {
    pub fn new(name: impl Into<String>, levels: Vec<LevelDescription>) -> Self {
        Self {
            name: name.into(),
            levels,
        }
    }

    /// A hierarchy with a single level, both named after the column
    pub fn single_level(column: impl Into<String>) -> Self {
        let level = LevelDescription::of_column(column);
        Self::new(level.name.clone(), vec![level])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDescription {
    pub name: String,
    pub hierarchies: Vec<HierarchyDescription>,
}

impl DimensionDescription {
    pub fn new(name: impl Into<String>, hierarchies: Vec<HierarchyDescription>) -> Self {
        Self {
            name: name.into(),
            hierarchies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeDescription {
    pub name: String,
    pub dimensions: Vec<DimensionDescription>,
    #[serde(default)]
    pub measures: Vec<MeasureDescription>,
}

impl CubeDescription {
    pub fn new(
        name: impl Into<String>,
        dimensions: Vec<DimensionDescription>,
        measures: Vec<MeasureDescription>,
    ) -> Self {
        Self {
            name: name.into(),
            dimensions,
            measures,
        }
    }
}
