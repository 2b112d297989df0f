//! Query results

use serde::{Deserialize, Serialize};

use crate::cube::{CubeModel, LevelPath};
use crate::datastore::Version;
use crate::schema::Value;

/// Nulls met while summing or averaging a measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDataWarning {
    pub measure: String,
    pub column: String,
    pub null_rows: u64,
}

/// One group: its level coordinate and one value per measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCell {
    pub coordinate: Vec<Value>,
    pub values: Vec<Value>,
}

/// Result of one query against one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultidimensionalResult {
    pub version: Version,
    /// Fully qualified group-by levels
    pub levels: Vec<LevelPath>,
    pub measures: Vec<String>,
    /// Groups in ascending coordinate order
    pub cells: Vec<ResultCell>,
    pub grand_total: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PartialDataWarning>,
}

impl MultidimensionalResult {
    pub fn cell(&self, coordinate: &[Value]) -> Option<&ResultCell> {
        self.cells
            .binary_search_by(|cell| cell.coordinate.as_slice().cmp(coordinate))
            .ok()
            .map(|i| &self.cells[i])
    }

    /// Value of a measure at a coordinate
    pub fn value(&self, coordinate: &[Value], measure: &str) -> Option<&Value> {
        let index = self.measures.iter().position(|m| m == measure)?;
        self.cell(coordinate)?.values.get(index)
    }

    /// Grand total of a measure
    pub fn total(&self, measure: &str) -> Option<&Value> {
        let index = self.measures.iter().position(|m| m == measure)?;
        self.grand_total.get(index)
    }

    /// Labels every member and value with the cube's formatters
    pub fn render(&self, cube: &CubeModel) -> RenderedResult {
        let levels: Vec<_> = self
            .levels
            .iter()
            .map(|path| cube.resolve_level(path).ok())
            .collect();
        let measures: Vec<_> = self.measures.iter().map(|m| cube.measure(m).ok()).collect();

        let render_values = |values: &[Value]| -> Vec<String> {
            values
                .iter()
                .zip(&measures)
                .map(|(value, measure)| match measure {
                    Some(measure) => measure.label(value),
                    None => value.to_string(),
                })
                .collect()
        };

        let rows = self
            .cells
            .iter()
            .map(|cell| RenderedRow {
                members: cell
                    .coordinate
                    .iter()
                    .zip(&levels)
                    .map(|(member, level)| match level {
                        Some(level) => level.label(member),
                        None => member.to_string(),
                    })
                    .collect(),
                values: render_values(&cell.values),
            })
            .collect();

        RenderedResult {
            version: self.version,
            levels: self.levels.iter().map(ToString::to_string).collect(),
            measures: self.measures.clone(),
            rows,
            grand_total: render_values(&self.grand_total),
            warnings: self.warnings.clone(),
        }
    }
}

/// A result with formatted labels, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedResult {
    pub version: Version,
    pub levels: Vec<String>,
    pub measures: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub grand_total: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PartialDataWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub members: Vec<String>,
    pub values: Vec<String>,
}
