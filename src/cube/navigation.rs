//! Member navigation
//!
//! Members of a level are the distinct values of its column among the fact
//! rows under a parent coordinate. They are listed in natural value order,
//! which is chronological for date and integer time levels.

use std::collections::btree_set;
use std::collections::{BTreeSet, HashMap};

use crate::aggregation::{QueryError, QueryResult};
use crate::schema::Value;
use crate::selection::FactView;

use super::errors::{CubeError, CubeResult};
use super::model::{CubeModel, Hierarchy, Level};
use super::path::HierarchyPath;

/// One member of a level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub value: Value,
    /// Formatted label
    pub label: String,
}

/// Sorted members of one level, formatted as they are yielded
pub struct Members<'a> {
    level: &'a Level,
    values: btree_set::IntoIter<Value>,
}

impl<'a> Members<'a> {
    /// Level the members belong to
    pub fn level(&self) -> &'a Level {
        self.level
    }
}

impl Iterator for Members<'_> {
    type Item = Member;

    fn next(&mut self) -> Option<Member> {
        let value = self.values.next()?;
        Some(Member {
            label: self.level.label(&value),
            value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl ExactSizeIterator for Members<'_> {}

impl CubeModel {
    /// Members of the level below `parent` in a hierarchy.
    ///
    /// `parent` holds one value per level from the top; an empty parent
    /// lists the first level.
    ///
    /// # Errors
    ///
    /// - `UnknownHierarchy` / `AmbiguousHierarchy` when the path does not
    ///   resolve
    /// - `InvalidCoordinate` when `parent` is as deep as the hierarchy
    pub fn members<'a>(
        &'a self,
        view: &FactView,
        hierarchy: &HierarchyPath,
        parent: &[Value],
    ) -> QueryResult<Members<'a>> {
        let hierarchy = self.resolve_hierarchy(hierarchy)?;
        let levels = hierarchy.levels();
        let Some(level) = levels.get(parent.len()) else {
            return Err(QueryError::InvalidCoordinate {
                hierarchy: hierarchy.path().to_string(),
                depth: parent.len(),
                levels: levels.len(),
            });
        };

        let values: BTreeSet<Value> = view
            .rows()
            .iter()
            .filter(|row| {
                levels
                    .iter()
                    .zip(parent)
                    .all(|(l, expected)| row.get(l.column_index()) == Some(expected))
            })
            .filter_map(|row| row.get(level.column_index()).cloned())
            .collect();

        Ok(Members {
            level,
            values: values.into_iter(),
        })
    }

    /// Checks that every member of a finer level has a single parent member,
    /// for every hierarchy of the cube.
    ///
    /// # Errors
    ///
    /// `LevelOrderViolation` naming the first member found under two parents.
    pub fn check_level_order(&self, view: &FactView) -> CubeResult<()> {
        for hierarchy in self.hierarchies() {
            check_hierarchy(hierarchy, view)?;
        }
        Ok(())
    }
}

fn check_hierarchy(hierarchy: &Hierarchy, view: &FactView) -> CubeResult<()> {
    for pair in hierarchy.levels().windows(2) {
        let (coarse, fine) = (&pair[0], &pair[1]);
        let mut parents: HashMap<&Value, &Value> = HashMap::new();
        for row in view.rows() {
            let (Some(parent), Some(child)) =
                (row.get(coarse.column_index()), row.get(fine.column_index()))
            else {
                continue;
            };
            match parents.get(child) {
                Some(seen) if *seen != parent => {
                    return Err(CubeError::LevelOrderViolation {
                        hierarchy: hierarchy.path().to_string(),
                        detail: format!(
                            "member '{}' of '{}' has parents '{}' and '{}' in '{}'",
                            child,
                            fine.name(),
                            seen,
                            parent,
                            coarse.name()
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    parents.insert(child, parent);
                }
            }
        }
    }
    Ok(())
}
