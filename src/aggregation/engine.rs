//! Aggregation engine
//!
//! Evaluates queries against an immutable snapshot:
//!
//! 1. Resolve group-by levels, filter levels and measures
//! 2. Materialize (or reuse) the snapshot's fact view
//! 3. Fold every row passing the filters into its group's accumulators
//! 4. Merge all groups into the grand total
//!
//! Results are cached per (datastore, version, query). Both caches are filled only
//! with complete results, so a failing query leaves them untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::BoundedCache;
use crate::cube::{CubeModel, HierarchyPath, Level, Measure, Member};
use crate::datastore::{Snapshot, Version};
use crate::error::ErrorCode;
use crate::observability::{log_event, Event, MetricsRegistry, Timer};
use crate::schema::Value;
use crate::selection::{FactView, FactViewCache, Selection, SelectionError};

use super::accumulator::Accumulator;
use super::errors::{QueryError, QueryResult};
use super::query::Query;
use super::result::{MultidimensionalResult, PartialDataWarning, ResultCell};

/// What a sum or average does when it meets null values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullPolicy {
    /// Nulls count as zero and the result carries a warning
    #[default]
    Warn,
    /// Nulls count as zero silently
    Ignore,
    /// The query fails with `PartialData`
    Reject,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub null_policy: NullPolicy,
    pub fact_view_cache_capacity: usize,
    pub result_cache_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            null_policy: NullPolicy::Warn,
            fact_view_cache_capacity: 4,
            result_cache_capacity: 64,
        }
    }
}

pub struct AggregationEngine {
    selection: Arc<Selection>,
    cube: Arc<CubeModel>,
    null_policy: NullPolicy,
    fact_views: FactViewCache,
    results: BoundedCache<(Uuid, Version, Query), MultidimensionalResult>,
    metrics: Arc<MetricsRegistry>,
}

impl AggregationEngine {
    pub fn new(
        selection: Arc<Selection>,
        cube: Arc<CubeModel>,
        options: EngineOptions,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            selection,
            cube,
            null_policy: options.null_policy,
            fact_views: FactViewCache::new(options.fact_view_cache_capacity, Arc::clone(&metrics)),
            results: BoundedCache::new(options.result_cache_capacity),
            metrics,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn cube(&self) -> &CubeModel {
        &self.cube
    }

    pub fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    /// Fact view of a snapshot, materialized once per datastore version
    pub fn fact_view(&self, snapshot: &Snapshot) -> QueryResult<Arc<FactView>> {
        let base = self.selection.base_store();
        if snapshot.store(base).is_none() {
            return Err(SelectionError::UnknownStore {
                store: base.to_string(),
            }
            .into());
        }
        Ok(self.fact_views.get_or_materialize(&self.selection, snapshot))
    }

    /// Members of the level below `parent` in a hierarchy
    pub fn members(
        &self,
        snapshot: &Snapshot,
        hierarchy: &HierarchyPath,
        parent: &[Value],
    ) -> QueryResult<Vec<Member>> {
        let view = self.fact_view(snapshot)?;
        let members = self.cube.members(&view, hierarchy, parent)?;
        Ok(members.collect())
    }

    /// Evaluates a query against a snapshot.
    ///
    /// # Errors
    ///
    /// - `UnknownLevel` / `AmbiguousLevel` for unresolvable group-by or
    ///   filter levels
    /// - `UnknownMeasure` for measures the cube does not define
    /// - `InvalidFilterMember` for filter members of another type than
    ///   their level's column
    /// - `PartialData` when a sum or average meets nulls under the
    ///   `Reject` policy
    /// - `Selection` when the snapshot lacks the selection's base store
    pub fn evaluate(
        &self,
        query: &Query,
        snapshot: &Snapshot,
    ) -> QueryResult<Arc<MultidimensionalResult>> {
        let timer = Timer::new();
        let version = snapshot.version().to_string();
        let key = (snapshot.datastore_id(), snapshot.version(), query.clone());

        if let Some(cached) = self.results.get(&key) {
            self.metrics.increment_query_cache_hits();
            self.metrics.increment_queries_executed();
            log_query_complete(&version, &cached, true, &timer);
            return Ok(cached);
        }

        match self.compute(query, snapshot) {
            Ok(result) => {
                self.metrics.increment_queries_executed();
                for warning in &result.warnings {
                    let nulls = warning.null_rows.to_string();
                    log_event(
                        Event::PartialData,
                        &[
                            ("version", &version),
                            ("measure", &warning.measure),
                            ("column", &warning.column),
                            ("null_rows", &nulls),
                        ],
                    );
                }
                let result = self.results.insert(key, Arc::new(result));
                log_query_complete(&version, &result, false, &timer);
                Ok(result)
            }
            Err(err) => {
                self.metrics.increment_queries_rejected();
                let reason = err.to_string();
                log_event(
                    Event::QueryRejected,
                    &[("version", &version), ("code", err.code()), ("reason", &reason)],
                );
                Err(err)
            }
        }
    }

    fn compute(&self, query: &Query, snapshot: &Snapshot) -> QueryResult<MultidimensionalResult> {
        let levels = query
            .group_by
            .iter()
            .map(|path| self.cube.resolve_level(path))
            .collect::<QueryResult<Vec<&Level>>>()?;
        let measures = query
            .measures
            .iter()
            .map(|name| self.cube.measure(name))
            .collect::<QueryResult<Vec<&Measure>>>()?;
        let filters = query
            .filters
            .iter()
            .map(|(path, members)| {
                let level = self.cube.resolve_level(path)?;
                Ok((level.column_index(), coerce_members(level, members)?))
            })
            .collect::<QueryResult<Vec<(usize, BTreeSet<Value>)>>>()?;

        let view = self.fact_view(snapshot)?;
        let new_accumulators = || -> Vec<Accumulator> {
            measures.iter().map(|m| Accumulator::new(m)).collect()
        };

        let mut groups: BTreeMap<Vec<Value>, Vec<Accumulator>> = BTreeMap::new();
        for (index, row) in view.rows().iter().enumerate() {
            let passes = filters
                .iter()
                .all(|(column, members)| row.get(*column).map_or(false, |v| members.contains(v)));
            if !passes {
                continue;
            }
            let coordinate = levels
                .iter()
                .map(|l| row.get(l.column_index()).cloned().unwrap_or(Value::Null))
                .collect();
            let accumulators = groups.entry(coordinate).or_insert_with(new_accumulators);
            for (accumulator, measure) in accumulators.iter_mut().zip(&measures) {
                accumulator.accumulate(index, measure.column_index().and_then(|c| row.get(c)));
            }
        }

        let mut totals = new_accumulators();
        for accumulators in groups.values() {
            for (total, partial) in totals.iter_mut().zip(accumulators) {
                total.merge(partial);
            }
        }

        let mut warnings = Vec::new();
        for (measure, total) in measures.iter().zip(&totals) {
            let null_rows = total.nulls();
            if null_rows == 0 {
                continue;
            }
            let column = measure
                .column_index()
                .and_then(|c| view.columns().get(c))
                .map(|c| c.name.clone())
                .unwrap_or_default();
            match self.null_policy {
                NullPolicy::Ignore => {}
                NullPolicy::Warn => warnings.push(PartialDataWarning {
                    measure: measure.name().to_string(),
                    column,
                    null_rows,
                }),
                NullPolicy::Reject => {
                    return Err(QueryError::PartialData {
                        measure: measure.name().to_string(),
                        column,
                        null_rows,
                    })
                }
            }
        }

        Ok(MultidimensionalResult {
            version: snapshot.version(),
            levels: levels.iter().map(|l| l.path()).collect(),
            measures: measures.iter().map(|m| m.name().to_string()).collect(),
            cells: groups
                .into_iter()
                .map(|(coordinate, accumulators)| ResultCell {
                    coordinate,
                    values: accumulators.iter().map(Accumulator::finish).collect(),
                })
                .collect(),
            grand_total: totals.iter().map(Accumulator::finish).collect(),
            warnings,
        })
    }
}

/// Brings filter members to the level's column type, as staging does for
/// rows, so `Int` members match widened `Double` columns.
fn coerce_members(level: &Level, members: &BTreeSet<Value>) -> QueryResult<BTreeSet<Value>> {
    let field_type = level.field_type();
    members
        .iter()
        .map(|member| {
            field_type
                .coerce(member.clone())
                .map_err(|actual| QueryError::InvalidFilterMember {
                    level: level.path().to_string(),
                    expected: field_type.type_name(),
                    actual: actual.type_name(),
                })
        })
        .collect()
}

fn log_query_complete(version: &str, result: &MultidimensionalResult, cached: bool, timer: &Timer) {
    let groups = result.cells.len().to_string();
    let measures = result.measures.len().to_string();
    log_event(
        Event::QueryComplete,
        &[
            ("version", version),
            ("groups", &groups),
            ("measures", &measures),
            ("cached", if cached { "true" } else { "false" }),
            ("elapsed_us", &timer.elapsed_us()),
        ],
    );
}
