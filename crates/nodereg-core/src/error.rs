//! Error types for registry storage and schema handling.
//!
//! Per-node failures (unreachable nodes, bad migrations, schema violations)
//! are not errors at this level: they are outcomes recorded on the node. The
//! types here cover the setup phase, where a failure legitimately ends a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reading or writing the registry and schema files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not the expected JSON document.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// File being decoded.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The temporary file could not be moved over the registry.
    #[error("failed to replace {}: {source}", path.display())]
    Persist {
        /// Registry file being replaced.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors preparing a schema validator.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document is not a valid JSON Schema, or one of its
    /// references could not be resolved.
    #[error("failed to compile schema: {0}")]
    Compile(String),

    /// The schema file could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = StoreError::Io {
            path: PathBuf::from("/var/lib/registry/node_registry.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let message = err.to_string();
        assert!(message.contains("node_registry.json"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_compile_error_display() {
        let err = SchemaError::Compile("unknown draft".to_string());
        assert!(err.to_string().contains("unknown draft"));
    }
}
