//! Engine configuration.
//!
//! Everything tunable at deployment time lives here: patience, pacing,
//! concurrency bounds, and the paths of the declarative data files. A config
//! can be built in code, loaded from YAML, or taken wholesale from
//! [`EngineConfig::default`]; every field has a default so YAML files only
//! name what they change.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a config file. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times an unanswered question is repeated before the dialog
    /// gives up and resets.
    pub patience: u32,
    /// Minimum gap between consecutive outbound messages, in milliseconds.
    pub pace_ms: u64,
    /// Upper bound on turns processed simultaneously across all users.
    pub max_concurrent_turns: usize,
    /// Buffered turns per user while an earlier turn is still running.
    pub lane_capacity: usize,
    /// Append a session-state line to every reply batch.
    pub debug: bool,
    /// Slot table path; the demo data ships under `data/slots.tsv`.
    pub slot_table: Option<PathBuf>,
    /// Route description path; the demo data ships under `data/routes.json`.
    pub routes: Option<PathBuf>,
    /// Phrase file path; defaults to the compiled-in phrases.
    pub phrases: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            patience: 2,
            pace_ms: 700,
            max_concurrent_turns: 8,
            lane_capacity: 32,
            debug: false,
            slot_table: None,
            routes: None,
            phrases: None,
        }
    }
}

impl EngineConfig {
    /// Pacing gap as a [`Duration`].
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    /// Parse a YAML config. Unnamed fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Malformed YAML or unknown field types are returned as
    /// [`ConfigError::Yaml`].
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.patience, 2);
        assert_eq!(config.pace(), Duration::from_millis(700));
        assert_eq!(config.max_concurrent_turns, 8);
        assert!(!config.debug);
        assert_eq!(config.slot_table, None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("patience: 3\npace_ms: 100\n").unwrap();
        assert_eq!(config.patience, 3);
        assert_eq!(config.pace_ms, 100);
        assert_eq!(config.max_concurrent_turns, 8);
    }

    #[test]
    fn test_paths_from_yaml() {
        let config =
            EngineConfig::from_yaml_str("slot_table: data/slots.tsv\nroutes: data/routes.json\n")
                .unwrap();
        assert_eq!(config.slot_table, Some(PathBuf::from("data/slots.tsv")));
        assert_eq!(config.routes, Some(PathBuf::from("data/routes.json")));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "debug: true\nlane_capacity: 4\n").unwrap();
        let config = EngineConfig::from_yaml_file(&path).unwrap();
        assert!(config.debug);
        assert_eq!(config.lane_capacity, 4);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let err = EngineConfig::from_yaml_str("patience: [not, a, number]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::from_yaml_file("/nonexistent/engine.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
