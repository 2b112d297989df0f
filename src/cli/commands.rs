//! CLI command implementations
//!
//! Every command builds its own `PivotManager` from the sample
//! descriptions, does one thing and prints one JSON response.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::aggregation::Query;
use crate::config::NanoPivotConfig;
use crate::cube::{HierarchyPath, LevelPath};
use crate::manager::PivotManager;
use crate::observability::{log_event, Event, Logger};
use crate::persistence::SnapshotImage;
use crate::sample;
use crate::schema::Value;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Load {
            config,
            export,
            structure,
        } => load(config.as_deref(), export, structure),
        Command::Query {
            config,
            image,
            measures,
            group_by,
            filters,
            raw,
        } => query(config.as_deref(), image.as_deref(), measures, group_by, filters, raw),
        Command::Members {
            config,
            hierarchy,
            parents,
        } => members(config.as_deref(), &hierarchy, &parents),
        Command::Export { config, out } => export(config.as_deref(), out),
        Command::Inspect { input } => inspect(&input),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<NanoPivotConfig> {
    let config = NanoPivotConfig::load_or_default(path)?;
    Logger::set_min_severity(config.log_level);
    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    log_event(Event::ConfigLoaded, &[("source", &source)]);
    Ok(config)
}

/// Load the sample data and print datastore statistics
pub fn load(config_path: Option<&Path>, export: Option<PathBuf>, structure: bool) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    config.display_store_structure |= structure;
    let manager = PivotManager::sample(&config)?;

    let target = export.or_else(|| config.snapshot_path.clone());
    let exported = match target {
        Some(path) => {
            manager.export(&path)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    write_response(json!({
        "manager": manager.name(),
        "catalog": manager.catalog(),
        "schema": manager.schema_name(),
        "stats": manager.stats(),
        "metrics": manager.datastore().metrics().snapshot(),
        "exported": exported,
    }))
}

/// Parse `level=value` filters, typing each value by its level's field
fn parse_filters(manager: &PivotManager, filters: &[String]) -> CliResult<Vec<(LevelPath, Value)>> {
    filters
        .iter()
        .map(|filter| {
            let (level, text) = filter.split_once('=').ok_or_else(|| {
                CliError::invalid_argument(format!("filter '{}' is not level=value", filter))
            })?;
            let path = LevelPath::parse(level.trim());
            let field_type = manager.cube().resolve_level(&path)?.field_type();
            let value = field_type.parse_value(text).ok_or_else(|| {
                CliError::invalid_argument(format!(
                    "'{}' is not a valid {} member of '{}'",
                    text,
                    field_type.type_name(),
                    path
                ))
            })?;
            Ok((path, value))
        })
        .collect()
}

/// Run one aggregation query and print the result
pub fn query(
    config_path: Option<&Path>,
    image: Option<&Path>,
    measures: Vec<String>,
    group_by: Vec<String>,
    filters: Vec<String>,
    raw: bool,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let manager = match image {
        Some(path) => PivotManager::sample_from_image(&SnapshotImage::read_from_file(path)?, &config)?,
        None => PivotManager::sample(&config)?,
    };

    let mut query = Query::new();
    for measure in measures {
        query = query.measure(measure);
    }
    for level in &group_by {
        query = query.group_by(LevelPath::parse(level));
    }
    for (level, value) in parse_filters(&manager, &filters)? {
        query = query.filter(level, [value]);
    }

    let result = manager.evaluate(&query)?;
    let data = if raw {
        serde_json::to_value(&*result)?
    } else {
        serde_json::to_value(result.render(manager.cube()))?
    };
    write_response(data)
}

/// List the members of a hierarchy level
pub fn members(config_path: Option<&Path>, hierarchy: &str, parents: &[String]) -> CliResult<()> {
    let config = load_config(config_path)?;
    let manager = PivotManager::sample(&config)?;
    let path = HierarchyPath::parse(hierarchy);

    let levels = manager.cube().resolve_hierarchy(&path)?.levels();
    let mut parent = Vec::with_capacity(parents.len());
    for (text, level) in parents.iter().zip(levels) {
        let value = level.field_type().parse_value(text).ok_or_else(|| {
            CliError::invalid_argument(format!("'{}' is not a member of '{}'", text, level.name()))
        })?;
        parent.push(value);
    }
    if parents.len() > parent.len() {
        return Err(CliError::invalid_argument(format!(
            "'{}' has only {} levels",
            path,
            levels.len()
        )));
    }

    let members: Vec<_> = manager
        .members(&path, &parent)?
        .into_iter()
        .map(|m| json!({ "value": m.value, "label": m.label }))
        .collect();
    write_response(json!({ "hierarchy": path.to_string(), "members": members }))
}

/// Load the sample data and write it as a snapshot image
pub fn export(config_path: Option<&Path>, out: Option<PathBuf>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let path = out
        .or_else(|| config.snapshot_path.clone())
        .ok_or_else(|| CliError::invalid_argument("no --out given and no snapshot_path configured"))?;

    let manager = PivotManager::sample(&config)?;
    let image = manager.export(&path)?;
    write_response(json!({
        "path": path.display().to_string(),
        "version": image.version,
        "rows": image.row_count(),
        "checksum": image.checksum,
    }))
}

/// Verify a snapshot image and print its statistics
pub fn inspect(input: &Path) -> CliResult<()> {
    let image = SnapshotImage::read_from_file(input)?;
    let stores: serde_json::Map<String, serde_json::Value> = image
        .stores
        .iter()
        .map(|(store, rows)| (store.clone(), json!(rows.len())))
        .collect();
    write_response(json!({
        "path": input.display().to_string(),
        "format_version": image.format_version,
        "created_at": image.created_at,
        "version": image.version,
        "rows": image.row_count(),
        "stores": stores,
        "checksum": image.checksum,
        "structure": sample::describe_structure(&image.schema),
    }))
}
