//! Error types for a registry update run.
//!
//! Only setup failures live here. Per-node failures never escape the
//! reconciler; they become a status and a [`NodeOutcome`](crate::NodeOutcome).

use std::path::PathBuf;
use thiserror::Error;

/// A failure that ends the whole run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this layout.
    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Loading or persisting the registry failed.
    #[error(transparent)]
    Store(#[from] nodereg_core::StoreError),

    /// The schema could not be loaded or compiled.
    #[error(transparent)]
    Schema(#[from] nodereg_core::SchemaError),

    /// The prober could not be constructed.
    #[error(transparent)]
    Probe(#[from] nodereg_prober::ProbeError),
}
