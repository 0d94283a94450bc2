//! Configuration types for the registry updater.

use crate::{ReconcileError, Result};
use nodereg_prober::ProbeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration, read from a TOML file.
///
/// ```toml
/// [registry]
/// registry_path = "node_registry.json"
/// schema_path = "node_registry.schema.json"
///
/// [probe]
/// timeout_secs = 30
/// max_concurrency = 4
///
/// [run]
/// dry_run = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistryConfig {
    /// Where the registry and its schema live.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// HTTP probing settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Run behaviour.
    #[serde(default)]
    pub run: RunConfig,
}

/// Registry file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the registry document.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Path to the registry JSON Schema.
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("node_registry.json")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("node_registry.schema.json")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            schema_path: default_schema_path(),
        }
    }
}

/// Run behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Reconcile and report without writing the registry back.
    #[serde(default)]
    pub dry_run: bool,
}

impl NodeRegistryConfig {
    /// Parses a TOML configuration document.
    pub fn from_toml_str(source: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Reads the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ReconcileError::ConfigIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_toml_str(&source).map_err(|source| ReconcileError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeRegistryConfig::default();
        assert_eq!(config.registry.registry_path, PathBuf::from("node_registry.json"));
        assert_eq!(config.registry.schema_path, PathBuf::from("node_registry.schema.json"));
        assert_eq!(config.probe.max_concurrency, 4);
        assert!(!config.run.dry_run);
    }

    #[test]
    fn test_partial_file() {
        let config = NodeRegistryConfig::from_toml_str(
            r#"
            [probe]
            max_concurrency = 8

            [run]
            dry_run = true
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.max_concurrency, 8);
        assert_eq!(config.probe.timeout_secs, 30);
        assert!(config.run.dry_run);
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = NodeRegistryConfig::from_toml_str("").unwrap();
        assert_eq!(config, NodeRegistryConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = NodeRegistryConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, NodeRegistryConfig::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nodereg.toml");
        std::fs::write(&path, "[probe\ntimeout_secs = ").unwrap();

        let err = NodeRegistryConfig::load(&path).unwrap_err();
        assert!(matches!(err, ReconcileError::ConfigParse { .. }));
    }
}
