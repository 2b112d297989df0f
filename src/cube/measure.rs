//! Measure descriptions

use serde::{Deserialize, Serialize};

/// How a measure reduces the rows of a group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AggregationKind {
    /// Number of rows
    Count,
    Sum { column: String },
    Average { column: String },
    Min { column: String },
    Max { column: String },
    /// Registered reduction over the column's values in row order
    Custom { reduction: String, column: String },
}

impl AggregationKind {
    pub fn column(&self) -> Option<&str> {
        match self {
            AggregationKind::Count => None,
            AggregationKind::Sum { column }
            | AggregationKind::Average { column }
            | AggregationKind::Min { column }
            | AggregationKind::Max { column }
            | AggregationKind::Custom { column, .. } => Some(column),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Sum { .. } => "sum",
            AggregationKind::Average { .. } => "average",
            AggregationKind::Min { .. } => "min",
            AggregationKind::Max { .. } => "max",
            AggregationKind::Custom { .. } => "custom",
        }
    }

    /// Whether the column must be numeric
    pub fn requires_numeric(&self) -> bool {
        matches!(
            self,
            AggregationKind::Sum { .. } | AggregationKind::Average { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDescription {
    pub name: String,
    #[serde(flatten)]
    pub kind: AggregationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
}

impl MeasureDescription {
    pub fn new(name: impl Into<String>, kind: AggregationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            formatter: None,
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, AggregationKind::Count)
    }

    pub fn sum(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, AggregationKind::Sum { column: column.into() })
    }

    pub fn average(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, AggregationKind::Average { column: column.into() })
    }

    pub fn min(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, AggregationKind::Min { column: column.into() })
    }

    pub fn max(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, AggregationKind::Max { column: column.into() })
    }

    pub fn custom(
        name: impl Into<String>,
        reduction: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            AggregationKind::Custom {
                reduction: reduction.into(),
                column: column.into(),
            },
        )
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }
}
