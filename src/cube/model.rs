//! Built cube model
//!
//! `build_cube` binds a `CubeDescription` to the columns of a fact view.
//! The resulting model is immutable and holds resolved column positions,
//! parsed formatters and custom reduction functions.

use std::collections::HashSet;

use crate::aggregation::{QueryError, QueryResult, Reduction, ReductionRegistry};
use crate::schema::{FieldType, Value};
use crate::selection::FactColumn;

use super::description::{CubeDescription, HierarchyDescription, LevelType};
use super::errors::{CubeError, CubeResult};
use super::format::Formatter;
use super::measure::{AggregationKind, MeasureDescription};
use super::path::{HierarchyPath, LevelPath};

#[derive(Debug, Clone)]
pub struct Level {
    name: String,
    hierarchy: String,
    dimension: String,
    column: String,
    column_index: usize,
    field_type: FieldType,
    level_type: LevelType,
    formatter: Option<Formatter>,
}

impl Level {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified path of this level
    pub fn path(&self) -> LevelPath {
        LevelPath::new(&self.name, &self.hierarchy, &self.dimension)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn column_index(&self) -> usize {
        self.column_index
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn level_type(&self) -> LevelType {
        self.level_type
    }

    /// Member label, formatted when the level has a formatter
    pub fn label(&self, member: &Value) -> String {
        match &self.formatter {
            Some(formatter) => formatter.format(member),
            None => member.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
    name: String,
    dimension: String,
    levels: Vec<Level>,
}

impl Hierarchy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn path(&self) -> HierarchyPath {
        HierarchyPath::new(&self.name, &self.dimension)
    }

    /// Levels, coarsest first
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

#[derive(Debug, Clone)]
pub struct Dimension {
    name: String,
    hierarchies: Vec<Hierarchy>,
}

impl Dimension {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hierarchies(&self) -> &[Hierarchy] {
        &self.hierarchies
    }
}

#[derive(Debug, Clone)]
pub struct Measure {
    name: String,
    kind: AggregationKind,
    column_index: Option<usize>,
    column_type: Option<FieldType>,
    reduction: Option<Reduction>,
    formatter: Option<Formatter>,
}

impl Measure {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AggregationKind {
        &self.kind
    }

    /// Fact view column read by the measure, `None` for counts
    pub fn column_index(&self) -> Option<usize> {
        self.column_index
    }

    pub fn column_type(&self) -> Option<FieldType> {
        self.column_type
    }

    pub(crate) fn reduction(&self) -> Option<Reduction> {
        self.reduction
    }

    pub fn label(&self, value: &Value) -> String {
        match &self.formatter {
            Some(formatter) => formatter.format(value),
            None => value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CubeModel {
    name: String,
    dimensions: Vec<Dimension>,
    measures: Vec<Measure>,
}

impl CubeModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn hierarchies(&self) -> impl Iterator<Item = &Hierarchy> {
        self.dimensions.iter().flat_map(|d| d.hierarchies.iter())
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.hierarchies().flat_map(|h| h.levels.iter())
    }

    /// Resolves a possibly partial level path to exactly one level
    pub fn resolve_level(&self, path: &LevelPath) -> QueryResult<&Level> {
        let matches: Vec<&Level> = self
            .levels()
            .filter(|l| path.matches(&l.name, &l.hierarchy, &l.dimension))
            .collect();
        match matches.as_slice() {
            [] => Err(QueryError::UnknownLevel {
                path: path.to_string(),
            }),
            [level] => Ok(level),
            many => Err(QueryError::AmbiguousLevel {
                path: path.to_string(),
                candidates: join_paths(many.iter().map(|l| l.path().to_string())),
            }),
        }
    }

    pub fn resolve_hierarchy(&self, path: &HierarchyPath) -> QueryResult<&Hierarchy> {
        let matches: Vec<&Hierarchy> = self
            .hierarchies()
            .filter(|h| path.matches(&h.name, &h.dimension))
            .collect();
        match matches.as_slice() {
            [] => Err(QueryError::UnknownHierarchy {
                path: path.to_string(),
            }),
            [hierarchy] => Ok(hierarchy),
            many => Err(QueryError::AmbiguousHierarchy {
                path: path.to_string(),
                candidates: join_paths(many.iter().map(|h| h.path().to_string())),
            }),
        }
    }

    pub fn measure(&self, name: &str) -> QueryResult<&Measure> {
        self.measures
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| QueryError::UnknownMeasure {
                measure: name.to_string(),
            })
    }
}

fn join_paths(paths: impl Iterator<Item = String>) -> String {
    paths.collect::<Vec<_>>().join(", ")
}

/// Builds a cube over the given fact view columns.
///
/// # Errors
///
/// Returns the first `CubeError` found, checking dimensions in declaration
/// order and measures last.
pub fn build_cube(
    description: &CubeDescription,
    columns: &[FactColumn],
    registry: &ReductionRegistry,
) -> CubeResult<CubeModel> {
    let column = |owner: &str, name: &str| -> CubeResult<(usize, FieldType)> {
        columns
            .iter()
            .position(|c| c.name == name)
            .map(|i| (i, columns[i].field_type))
            .ok_or_else(|| CubeError::UnknownColumn {
                owner: owner.to_string(),
                column: name.to_string(),
            })
    };

    let mut dimension_names = HashSet::new();
    let mut dimensions = Vec::with_capacity(description.dimensions.len());
    for dimension in &description.dimensions {
        if !dimension_names.insert(dimension.name.as_str()) {
            return Err(CubeError::DuplicateName {
                kind: "dimension",
                name: dimension.name.clone(),
            });
        }
        if dimension.hierarchies.is_empty() {
            return Err(CubeError::EmptyHierarchy {
                path: dimension.name.clone(),
            });
        }

        let mut hierarchy_names = HashSet::new();
        let mut hierarchies = Vec::with_capacity(dimension.hierarchies.len());
        for hierarchy in &dimension.hierarchies {
            let path = format!("{}@{}", hierarchy.name, dimension.name);
            if !hierarchy_names.insert(hierarchy.name.as_str()) {
                return Err(CubeError::DuplicateName {
                    kind: "hierarchy",
                    name: path,
                });
            }
            hierarchies.push(build_hierarchy(hierarchy, &dimension.name, path, &column)?);
        }
        dimensions.push(Dimension {
            name: dimension.name.clone(),
            hierarchies,
        });
    }

    let mut measure_names = HashSet::new();
    let mut measures = Vec::with_capacity(description.measures.len());
    for measure in &description.measures {
        if !measure_names.insert(measure.name.as_str()) {
            return Err(CubeError::DuplicateName {
                kind: "measure",
                name: measure.name.clone(),
            });
        }
        measures.push(build_measure(measure, &column, registry)?);
    }

    Ok(CubeModel {
        name: description.name.clone(),
        dimensions,
        measures,
    })
}

fn build_hierarchy(
    hierarchy: &HierarchyDescription,
    dimension: &str,
    path: String,
    column: &dyn Fn(&str, &str) -> CubeResult<(usize, FieldType)>,
) -> CubeResult<Hierarchy> {
    if hierarchy.levels.is_empty() {
        return Err(CubeError::EmptyHierarchy { path });
    }

    let mut level_names = HashSet::new();
    let mut bound_columns = HashSet::new();
    let mut levels = Vec::with_capacity(hierarchy.levels.len());
    for level in &hierarchy.levels {
        let owner = format!("{}@{}", level.name, path);
        if !level_names.insert(level.name.as_str()) {
            return Err(CubeError::DuplicateName {
                kind: "level",
                name: owner,
            });
        }
        let (column_index, field_type) = column(&owner, &level.column)?;
        if !bound_columns.insert(column_index) {
            return Err(CubeError::LevelOrderViolation {
                hierarchy: path,
                detail: format!("column '{}' is bound by more than one level", level.column),
            });
        }
        if level.level_type == LevelType::Time
            && !matches!(field_type, FieldType::Date | FieldType::Int)
        {
            return Err(CubeError::InvalidTimeLevel {
                level: owner,
                column: level.column.clone(),
                field_type: field_type.type_name().to_string(),
            });
        }
        let formatter = parse_formatter(&owner, level.formatter.as_deref())?;
        levels.push(Level {
            name: level.name.clone(),
            hierarchy: hierarchy.name.clone(),
            dimension: dimension.to_string(),
            column: level.column.clone(),
            column_index,
            field_type,
            level_type: level.level_type,
            formatter,
        });
    }

    Ok(Hierarchy {
        name: hierarchy.name.clone(),
        dimension: dimension.to_string(),
        levels,
    })
}

fn build_measure(
    measure: &MeasureDescription,
    column: &dyn Fn(&str, &str) -> CubeResult<(usize, FieldType)>,
    registry: &ReductionRegistry,
) -> CubeResult<Measure> {
    let (column_index, column_type) = match measure.kind.column() {
        Some(name) => {
            let (index, field_type) = column(&measure.name, name)?;
            (Some(index), Some(field_type))
        }
        None => (None, None),
    };

    if measure.kind.requires_numeric() && !column_type.map_or(false, |t| t.is_numeric()) {
        return Err(CubeError::InvalidMeasure {
            measure: measure.name.clone(),
            detail: format!(
                "{} needs a numeric column, '{}' is {}",
                measure.kind.name(),
                measure.kind.column().unwrap_or_default(),
                column_type.map_or("unknown", |t| t.type_name())
            ),
        });
    }

    let reduction = match &measure.kind {
        AggregationKind::Custom { reduction, .. } => {
            Some(registry.get(reduction).ok_or_else(|| CubeError::InvalidMeasure {
                measure: measure.name.clone(),
                detail: format!("reduction '{}' is not registered", reduction),
            })?)
        }
        _ => None,
    };

    Ok(Measure {
        name: measure.name.clone(),
        kind: measure.kind.clone(),
        column_index,
        column_type,
        reduction,
        formatter: parse_formatter(&measure.name, measure.formatter.as_deref())?,
    })
}

fn parse_formatter(owner: &str, formatter: Option<&str>) -> CubeResult<Option<Formatter>> {
    formatter
        .map(|f| {
            Formatter::parse(f).ok_or_else(|| CubeError::InvalidFormatter {
                owner: owner.to_string(),
                formatter: f.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{DimensionDescription, LevelDescription};
    use crate::error::ErrorCode;

    fn column(name: &str, field_type: FieldType) -> FactColumn {
        FactColumn {
            name: name.to_string(),
            store: "Orders".to_string(),
            field: name.to_string(),
            field_type,
            path: Vec::new(),
        }
    }

    fn columns() -> Vec<FactColumn> {
        vec![
            column("id", FieldType::Int),
            column("date", FieldType::Date),
            column("country", FieldType::String),
            column("sales", FieldType::Double),
        ]
    }

    fn cube(dimensions: Vec<DimensionDescription>, measures: Vec<MeasureDescription>) -> CubeDescription {
        CubeDescription::new("Test", dimensions, measures)
    }

    fn geography() -> DimensionDescription {
        DimensionDescription::new("Geography", vec![HierarchyDescription::single_level("country")])
    }

    #[test]
    fn test_build_and_resolve() {
        let desc = cube(vec![geography()], vec![MeasureDescription::sum("Sum of Sales", "sales")]);
        let model = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap();

        let level = model.resolve_level(&LevelPath::parse("country")).unwrap();
        assert_eq!(level.column_index(), 2);
        assert_eq!(level.path().to_string(), "country@country@Geography");
        assert_eq!(model.measure("Sum of Sales").unwrap().column_index(), Some(3));
    }

    #[test]
    fn test_unknown_column() {
        let desc = cube(
            vec![DimensionDescription::new(
                "Geography",
                vec![HierarchyDescription::single_level("city")],
            )],
            vec![],
        );
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert!(matches!(err, CubeError::UnknownColumn { .. }));
    }

    #[test]
    fn test_column_bound_twice_in_hierarchy() {
        let desc = cube(
            vec![DimensionDescription::new(
                "Geography",
                vec![HierarchyDescription::new(
                    "Geo",
                    vec![
                        LevelDescription::of_column("country"),
                        LevelDescription::new("again", "country"),
                    ],
                )],
            )],
            vec![],
        );
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert_eq!(err.code(), "NANO_CUBE_LEVEL_ORDER_VIOLATION");
    }

    #[test]
    fn test_time_level_needs_date_or_int() {
        let desc = cube(
            vec![DimensionDescription::new(
                "Geography",
                vec![HierarchyDescription::new(
                    "Geo",
                    vec![LevelDescription::of_column("country").time()],
                )],
            )],
            vec![],
        );
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert!(matches!(err, CubeError::InvalidTimeLevel { .. }));
    }

    #[test]
    fn test_sum_over_string_is_invalid() {
        let desc = cube(vec![geography()], vec![MeasureDescription::sum("bad", "country")]);
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert!(matches!(err, CubeError::InvalidMeasure { .. }));
    }

    #[test]
    fn test_unregistered_reduction() {
        let desc = cube(
            vec![geography()],
            vec![MeasureDescription::custom("Countries", "distinct_count", "country")],
        );
        assert!(build_cube(&desc, &columns(), &ReductionRegistry::new()).is_err());
        assert!(build_cube(&desc, &columns(), &ReductionRegistry::with_builtins()).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        let desc = cube(vec![geography(), geography()], vec![]);
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert!(matches!(err, CubeError::DuplicateName { kind: "dimension", .. }));

        let desc = cube(
            vec![geography()],
            vec![MeasureDescription::count("n"), MeasureDescription::count("n")],
        );
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert!(matches!(err, CubeError::DuplicateName { kind: "measure", .. }));
    }

    #[test]
    fn test_empty_hierarchy() {
        let desc = cube(
            vec![DimensionDescription::new(
                "Geography",
                vec![HierarchyDescription::new("Geo", vec![])],
            )],
            vec![],
        );
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert_eq!(err, CubeError::EmptyHierarchy { path: "Geo@Geography".to_string() });
    }

    #[test]
    fn test_invalid_formatter() {
        let desc = cube(
            vec![geography()],
            vec![MeasureDescription::count("n").with_formatter("PERCENT[0]")],
        );
        let err = build_cube(&desc, &columns(), &ReductionRegistry::new()).unwrap_err();
        assert!(matches!(err, CubeError::InvalidFormatter { .. }));
    }
}
