//! # Registry Store
//!
//! File-backed persistence for the registry document. The registry is read
//! once at the start of a run and written once at the end; the file is always
//! replaced wholesale.
//!
//! ## Durability
//!
//! [`RegistryStore::persist`] writes to a temporary file in the registry's
//! directory and renames it over the target. Readers see either the previous
//! document or the new one, never a truncated mix.
//!
//! ## Format
//!
//! | Aspect | Value |
//! |--------|-------|
//! | Encoding | UTF-8 JSON |
//! | Indentation | two spaces |
//! | Key order | node insertion order; record fields in model order |
//! | Trailing newline | yes |

use crate::error::{Result, StoreError};
use crate::models::Registry;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle to the registry file.
///
/// # Example
///
/// ```rust,no_run
/// use nodereg_core::RegistryStore;
///
/// let store = RegistryStore::new("node_registry.json");
/// let registry = store.load()?;
/// println!("{} nodes registered", registry.len());
/// store.persist(&registry)?;
/// # Ok::<(), nodereg_core::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Creates a store for the registry file at `path`.
    ///
    /// Nothing is read until [`load`](Self::load) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read and
    /// [`StoreError::Json`] if it is not a registry document.
    pub fn load(&self) -> Result<Registry> {
        let registry: Registry = read_json(&self.path)?;
        debug!(path = %self.path.display(), nodes = registry.len(), "loaded registry");
        Ok(registry)
    }

    /// Reads the registry as untyped JSON, exactly as stored.
    pub fn load_raw(&self) -> Result<Value> {
        read_json(&self.path)
    }

    /// Atomically replaces the registry file with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the temporary file cannot be created or
    /// written, and [`StoreError::Persist`] if it cannot be renamed into place.
    pub fn persist(&self, registry: &Registry) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut bytes = serde_json::to_vec_pretty(registry).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        bytes.push(b'\n');

        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(path = %self.path.display(), nodes = registry.len(), "persisted registry");
        Ok(())
    }
}

/// Reads the schema document at `path`.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Value> {
    read_json(path.as_ref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
