//! Selection planning
//!
//! Walks the reference graph depth first from the base store, in reference
//! declaration order, and records one join step per reference followed.
//! Every field of every reached store becomes a fact column.

use std::collections::HashMap;

use serde::Serialize;

use crate::schema::{FieldType, SchemaDescription, StoreDescription};

use super::errors::{SelectionError, SelectionResult};

/// Step index of the base store in `Selection::steps`
pub(crate) const BASE_STEP: usize = 0;

/// One column of the fact view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactColumn {
    /// Column name, unique within the selection
    pub name: String,
    /// Store the value is read from
    pub store: String,
    pub field: String,
    pub field_type: FieldType,
    /// Reference names followed from the base store, empty for base fields
    pub path: Vec<String>,
}

impl FactColumn {
    pub fn is_base(&self) -> bool {
        self.path.is_empty()
    }
}

/// A store reached from the base store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    /// Reference followed into this store, `None` for the base store
    pub reference: Option<String>,
    pub store: String,
    /// Step whose row holds the source fields
    pub parent: usize,
    /// Positions in the parent row forming this store's key
    pub(crate) source_indices: Vec<usize>,
}

/// Compiled denormalization of a base store and everything it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    base_store: String,
    steps: Vec<JoinStep>,
    columns: Vec<FactColumn>,
    /// `(step, field index)` of every column
    sources: Vec<(usize, usize)>,
}

impl Selection {
    pub fn base_store(&self) -> &str {
        &self.base_store
    }

    pub fn columns(&self) -> &[FactColumn] {
        &self.columns
    }

    pub fn steps(&self) -> &[JoinStep] {
        &self.steps
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub(crate) fn sources(&self) -> &[(usize, usize)] {
        &self.sources
    }
}

/// Builds the selection of `base_store` over `schema`.
///
/// # Errors
///
/// - `UnknownStore` when the base store is not declared
/// - `CyclicReferences` when a reference cycle is reachable from the base
pub fn build_selection(schema: &SchemaDescription, base_store: &str) -> SelectionResult<Selection> {
    let base = schema
        .store(base_store)
        .ok_or_else(|| SelectionError::UnknownStore {
            store: base_store.to_string(),
        })?;

    let mut planner = Planner {
        schema,
        base: base_store,
        steps: vec![JoinStep {
            reference: None,
            store: base.name.clone(),
            parent: BASE_STEP,
            source_indices: Vec::new(),
        }],
        paths: vec![Vec::new()],
        stack: vec![base.name.clone()],
    };
    planner.visit(base, BASE_STEP)?;

    let Planner { steps, paths, .. } = planner;
    let (columns, sources) = name_columns(schema, &steps, &paths);

    Ok(Selection {
        base_store: base_store.to_string(),
        steps,
        columns,
        sources,
    })
}

struct Planner<'a> {
    schema: &'a SchemaDescription,
    base: &'a str,
    steps: Vec<JoinStep>,
    /// Reference path of each step
    paths: Vec<Vec<String>>,
    /// Stores on the current DFS path
    stack: Vec<String>,
}

impl<'a> Planner<'a> {
    fn visit(&mut self, store: &StoreDescription, step: usize) -> SelectionResult<()> {
        let schema = self.schema;
        for reference in schema.references_from(&store.name) {
            if self.stack.iter().any(|s| *s == reference.to_store) {
                let mut path = self.paths[step].clone();
                path.push(reference.name.clone());
                return Err(SelectionError::CyclicReferences {
                    base: self.base.to_string(),
                    path: path.join("/"),
                });
            }
            let (Some(target), Some(source_indices)) = (
                schema.store(&reference.to_store),
                schema.source_key_indices(reference),
            ) else {
                continue;
            };

            let mut path = self.paths[step].clone();
            path.push(reference.name.clone());
            self.steps.push(JoinStep {
                reference: Some(reference.name.clone()),
                store: target.name.clone(),
                parent: step,
                source_indices,
            });
            self.paths.push(path);

            let child = self.steps.len() - 1;
            self.stack.push(target.name.clone());
            self.visit(target, child)?;
            self.stack.pop();
        }
        Ok(())
    }
}

/// Names every field of every step.
///
/// Base fields keep their name. Joined fields keep their bare name when it
/// is unique across the selection, else take `Store.field`, else the
/// reference path `ref1/ref2.field`.
fn name_columns(
    schema: &SchemaDescription,
    steps: &[JoinStep],
    paths: &[Vec<String>],
) -> (Vec<FactColumn>, Vec<(usize, usize)>) {
    let mut bare_counts: HashMap<&str, usize> = HashMap::new();
    let mut store_visits: HashMap<&str, usize> = HashMap::new();
    for step in steps {
        *store_visits.entry(step.store.as_str()).or_default() += 1;
        if let Some(store) = schema.store(&step.store) {
            for field in &store.fields {
                *bare_counts.entry(field.name.as_str()).or_default() += 1;
            }
        }
    }

    let mut columns = Vec::new();
    let mut sources = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let Some(store) = schema.store(&step.store) else {
            continue;
        };
        for (field_index, field) in store.fields.iter().enumerate() {
            let name = if index == BASE_STEP || bare_counts[field.name.as_str()] == 1 {
                field.name.clone()
            } else if store_visits[step.store.as_str()] == 1 {
                format!("{}.{}", step.store, field.name)
            } else {
                format!("{}.{}", paths[index].join("/"), field.name)
            };
            columns.push(FactColumn {
                name,
                store: step.store.clone(),
                field: field.name.clone(),
                field_type: field.field_type,
                path: paths[index].clone(),
            });
            sources.push((index, field_index));
        }
    }
    (columns, sources)
}
