//! Pivot manager
//!
//! Owns one schema, its datastore, the selection over it, the cube and the
//! aggregation engine. Built once at startup; there is no global registry.
//!
//! # Startup sequence
//!
//! 1. Validate the schema and create the datastore
//! 2. Build the selection from the base store
//! 3. Build the cube over the selection's columns
//! 4. Create the aggregation engine

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::aggregation::{
    AggregationEngine, MultidimensionalResult, Query, QueryError, QueryResult, ReductionRegistry,
};
use crate::config::{ConfigError, NanoPivotConfig};
use crate::cube::{build_cube, CubeDescription, CubeError, CubeModel, HierarchyPath, Member};
use crate::datastore::{Datastore, DatastoreOptions, DatastoreStats};
use crate::error::{ErrorCode, Severity};
use crate::observability::{log_event, Event, ObservationScope, Timer};
use crate::persistence::{PersistenceError, PersistenceResult, SnapshotImage};
use crate::sample::{self, LoadError};
use crate::schema::{SchemaDescription, SchemaError, Value};
use crate::selection::{build_selection, SelectionError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Cube(#[from] CubeError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ErrorCode for StartupError {
    fn code(&self) -> &'static str {
        match self {
            StartupError::Config(e) => e.code(),
            StartupError::Schema(e) => e.code(),
            StartupError::Selection(e) => e.code(),
            StartupError::Cube(e) => e.code(),
            StartupError::Load(e) => e.code(),
            StartupError::Persistence(e) => e.code(),
            StartupError::Query(e) => e.code(),
        }
    }

    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Names and descriptions a manager is built from
#[derive(Debug, Clone)]
pub struct PivotDescription {
    pub name: String,
    pub catalog: String,
    pub schema_name: String,
    pub base_store: String,
    pub schema: SchemaDescription,
    pub cube: CubeDescription,
}

impl PivotDescription {
    /// The NanoPivot sample application
    pub fn sample() -> Self {
        Self {
            name: sample::MANAGER_NAME.to_string(),
            catalog: sample::CATALOG_NAME.to_string(),
            schema_name: sample::SCHEMA_NAME.to_string(),
            base_store: sample::STORE_ORDERS.to_string(),
            schema: sample::schema(),
            cube: sample::cube_description(),
        }
    }
}

pub struct PivotManager {
    name: String,
    catalog: String,
    schema_name: String,
    datastore: Arc<Datastore>,
    engine: AggregationEngine,
}

impl PivotManager {
    /// Builds a manager over a new, empty datastore
    pub fn build(
        description: PivotDescription,
        config: &NanoPivotConfig,
        registry: &ReductionRegistry,
    ) -> Result<Self, StartupError> {
        let options = DatastoreOptions {
            commit_timeout: config.commit_timeout(),
            ..DatastoreOptions::default()
        };
        let datastore = Datastore::with_options(description.schema.clone(), options)?;
        Self::with_datastore(description, datastore, config, registry)
    }

    /// Builds a manager over an existing datastore.
    ///
    /// The datastore's schema replaces the description's.
    pub fn with_datastore(
        description: PivotDescription,
        datastore: Datastore,
        config: &NanoPivotConfig,
        registry: &ReductionRegistry,
    ) -> Result<Self, StartupError> {
        let timer = Timer::new();
        log_event(Event::StartupBegin, &[("manager", &description.name)]);

        let result = Self::assemble(description, datastore, config, registry);
        match &result {
            Ok(manager) => {
                log_event(
                    Event::StartupComplete,
                    &[
                        ("manager", &manager.name),
                        ("catalog", &manager.catalog),
                        ("schema", &manager.schema_name),
                        ("elapsed_ms", &timer.elapsed_ms()),
                    ],
                );
            }
            Err(err) => {
                let reason = err.to_string();
                log_event(Event::StartupFailed, &[("code", err.code()), ("reason", &reason)]);
            }
        }
        result
    }

    fn assemble(
        description: PivotDescription,
        datastore: Datastore,
        config: &NanoPivotConfig,
        registry: &ReductionRegistry,
    ) -> Result<Self, StartupError> {
        let selection = build_selection(datastore.schema(), &description.base_store)?;
        let columns = selection.columns().len().to_string();
        log_event(
            Event::SelectionBuilt,
            &[("base_store", &description.base_store), ("columns", &columns)],
        );

        let cube = build_cube(&description.cube, selection.columns(), registry)?;
        let dimensions = cube.dimensions().len().to_string();
        let measures = cube.measures().len().to_string();
        log_event(
            Event::CubeBuilt,
            &[
                ("cube", cube.name()),
                ("dimensions", &dimensions),
                ("measures", &measures),
            ],
        );

        let metrics = Arc::clone(datastore.metrics());
        let engine = AggregationEngine::new(
            Arc::new(selection),
            Arc::new(cube),
            config.engine_options(),
            metrics,
        );

        Ok(Self {
            name: description.name,
            catalog: description.catalog,
            schema_name: description.schema_name,
            datastore: Arc::new(datastore),
            engine,
        })
    }

    /// Builds the sample application and loads its data
    pub fn sample(config: &NanoPivotConfig) -> Result<Self, StartupError> {
        let manager = Self::build(
            PivotDescription::sample(),
            config,
            &ReductionRegistry::with_builtins(),
        )?;
        sample::load(&manager.datastore)?;
        manager.check_level_order()?;
        if config.display_store_structure {
            eprint!("{}", sample::describe_structure(manager.datastore.schema()));
            eprint!("{}", sample::describe_contents(&manager.datastore.head()));
        }
        Ok(manager)
    }

    /// Builds the sample application over a restored image
    pub fn sample_from_image(
        image: &SnapshotImage,
        config: &NanoPivotConfig,
    ) -> Result<Self, StartupError> {
        let options = DatastoreOptions {
            commit_timeout: config.commit_timeout(),
            ..DatastoreOptions::default()
        };
        let datastore = image.restore(options)?;
        Self::with_datastore(
            PivotDescription::sample(),
            datastore,
            config,
            &ReductionRegistry::with_builtins(),
        )
    }

    /// Checks that every hierarchy's levels nest in the current head
    pub fn check_level_order(&self) -> Result<(), StartupError> {
        let view = self.engine.fact_view(&self.datastore.head())?;
        self.cube().check_level_order(&view)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn datastore(&self) -> &Arc<Datastore> {
        &self.datastore
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    pub fn cube(&self) -> &CubeModel {
        self.engine.cube()
    }

    pub fn stats(&self) -> DatastoreStats {
        self.datastore.stats()
    }

    /// Evaluates a query against the current head
    pub fn evaluate(&self, query: &Query) -> QueryResult<Arc<MultidimensionalResult>> {
        self.engine.evaluate(query, &self.datastore.head())
    }

    /// Members below `parent` in the current head
    pub fn members(&self, hierarchy: &HierarchyPath, parent: &[Value]) -> QueryResult<Vec<Member>> {
        self.engine.members(&self.datastore.head(), hierarchy, parent)
    }

    /// Writes the current head to `path`
    pub fn export(&self, path: &Path) -> PersistenceResult<SnapshotImage> {
        let path_str = path.display().to_string();
        let scope = ObservationScope::with_fields("SNAPSHOT_EXPORT", &[("path", &path_str)]);
        let result = SnapshotImage::capture(&self.datastore.head()).and_then(|image| {
            image.write_to_file(path)?;
            Ok(image)
        });
        match &result {
            Ok(image) => {
                let version = image.version.to_string();
                scope.complete_with_fields(&[("version", &version)]);
            }
            Err(err) => scope.fail(err.code(), &err.to_string()),
        }
        result
    }
}
