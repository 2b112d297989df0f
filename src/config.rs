//! Configuration file
//!
//! JSON, every field optional:
//!
//! ```json
//! {
//!   "null_policy": "warn",
//!   "commit_timeout_ms": 5000,
//!   "fact_view_cache_capacity": 4,
//!   "result_cache_capacity": 64,
//!   "display_store_structure": true,
//!   "snapshot_path": "./nanopivot.image.json",
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregation::{EngineOptions, NullPolicy};
use crate::error::{ErrorCode, Severity};
use crate::observability::Severity as LogSeverity;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "NANO_CONFIG_READ",
            ConfigError::Parse(_) => "NANO_CONFIG_PARSE",
            ConfigError::Invalid(_) => "NANO_CONFIG_INVALID",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NanoPivotConfig {
    #[serde(default)]
    pub null_policy: NullPolicy,

    /// Longest wait for the commit lock; absent waits indefinitely
    #[serde(default)]
    pub commit_timeout_ms: Option<u64>,

    #[serde(default = "default_fact_view_cache_capacity")]
    pub fact_view_cache_capacity: usize,

    #[serde(default = "default_result_cache_capacity")]
    pub result_cache_capacity: usize,

    /// Print the datastore structure and store contents to stderr after
    /// the sample load
    #[serde(default = "default_display_store_structure")]
    pub display_store_structure: bool,

    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: LogSeverity,
}

fn default_fact_view_cache_capacity() -> usize {
    4
}

fn default_result_cache_capacity() -> usize {
    64
}

fn default_display_store_structure() -> bool {
    true
}

fn default_log_level() -> LogSeverity {
    LogSeverity::Info
}

impl Default for NanoPivotConfig {
    fn default() -> Self {
        Self {
            null_policy: NullPolicy::default(),
            commit_timeout_ms: None,
            fact_view_cache_capacity: default_fact_view_cache_capacity(),
            result_cache_capacity: default_result_cache_capacity(),
            display_store_structure: default_display_store_structure(),
            snapshot_path: None,
            log_level: default_log_level(),
        }
    }
}

impl NanoPivotConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: NanoPivotConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.commit_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "commit_timeout_ms must be > 0 when set".to_string(),
            ));
        }
        if self.fact_view_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "fact_view_cache_capacity must be > 0".to_string(),
            ));
        }
        if let Some(path) = &self.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("snapshot_path is empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn commit_timeout(&self) -> Option<Duration> {
        self.commit_timeout_ms.map(Duration::from_millis)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            null_policy: self.null_policy,
            fact_view_cache_capacity: self.fact_view_cache_capacity,
            result_cache_capacity: self.result_cache_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = NanoPivotConfig::from_json("{}").unwrap();
        assert_eq!(config, NanoPivotConfig::default());
        assert_eq!(config.null_policy, NullPolicy::Warn);
        assert_eq!(config.commit_timeout(), None);
        assert!(config.display_store_structure);
    }

    #[test]
    fn test_full_config() {
        let config = NanoPivotConfig::from_json(
            r#"{
                "null_policy": "reject",
                "commit_timeout_ms": 250,
                "result_cache_capacity": 0,
                "display_store_structure": false,
                "snapshot_path": "/tmp/nano.json",
                "log_level": "warn"
            }"#,
        )
        .unwrap();
        assert_eq!(config.null_policy, NullPolicy::Reject);
        assert_eq!(config.commit_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.engine_options().result_cache_capacity, 0);
        assert!(!config.display_store_structure);
        assert_eq!(config.log_level, LogSeverity::Warn);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = NanoPivotConfig::from_json(r#"{"commit_timeout_ms": 0}"#).unwrap_err();
        assert_eq!(err.code(), "NANO_CONFIG_INVALID");
    }

    #[test]
    fn test_rejects_unknown_null_policy() {
        let err = NanoPivotConfig::from_json(r#"{"null_policy": "drop"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"fact_view_cache_capacity": 2}}"#).unwrap();
        let config = NanoPivotConfig::load(file.path()).unwrap();
        assert_eq!(config.fact_view_cache_capacity, 2);
    }

    #[test]
    fn test_missing_file() {
        let err = NanoPivotConfig::load(Path::new("/nonexistent/nanopivot.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
