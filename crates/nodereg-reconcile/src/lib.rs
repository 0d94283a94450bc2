//! # nodereg-reconcile
//!
//! The update run for a federated node registry. Each node is probed, its
//! fetched data migrated to the current shape, and the whole registry
//! validated with that node's candidate record in place. A node is committed
//! only when the whole document validates; otherwise its pre-run record stands
//! and its `status` says why.
//!
//! ## Outcomes
//!
//! | Outcome | Trigger | Status | Data |
//! |---------|---------|--------|------|
//! | Online | fetch, migration and validation succeed | `online` | committed, `last_updated` advanced |
//! | Offline | connection failure or no endpoint | `offline` | unchanged |
//! | Unresponsive | a body is not a JSON object | `unresponsive` | unchanged |
//! | Invalid configuration | bad field type, migration failure or schema violation | `invalid_configuration` | unchanged |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      nodereg-reconcile                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   RegistryStore::load                                           │
//! │          │                                                      │
//! │          ▼                                                      │
//! │   ┌──────────────┐  buffered(n)   ┌──────────────┐              │
//! │   │  Reconciler  │───────────────▶│  NodeProber  │              │
//! │   └──────┬───────┘                └──────────────┘              │
//! │          │ per node, in order                                   │
//! │          ▼                                                      │
//! │   snapshot ─▶ candidate ─▶ MigrationChain ─▶ stamp              │
//! │                                                │                │
//! │                                                ▼                │
//! │                               SchemaValidator(whole document)   │
//! │                                   │                 │           │
//! │                                 valid            invalid        │
//! │                                   ▼                 ▼           │
//! │                             swap candidate   snapshot + status  │
//! │                                                                 │
//! │   RegistryStore::persist (once, skipped on dry run)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nodereg_core::{JsonSchemaValidator, RegistryStore};
//! use nodereg_prober::HttpProber;
//! use nodereg_reconcile::{run, NodeRegistryConfig};
//!
//! # async fn update() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NodeRegistryConfig::load("nodereg.toml")?;
//! let store = RegistryStore::new(&config.registry.registry_path);
//! let validator = JsonSchemaValidator::from_file(&config.registry.schema_path)?;
//! let prober = HttpProber::new(&config.probe)?;
//!
//! let result = run(&config, &store, Box::new(validator), Box::new(prober)).await?;
//! for (name, outcome) in result.report.outcomes() {
//!     println!("{name}: {outcome}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - Per-node failures never abort the run or touch other nodes
//! - The registry is persisted once, at the end
//! - `last_updated` only moves forward; `date_added` is set once

mod clock;
mod config;
mod error;
mod outcome;
mod reconciler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{NodeRegistryConfig, RegistryConfig, RunConfig};
pub use error::ReconcileError;
pub use outcome::{InvalidCause, NodeOutcome, RunReport};
pub use reconciler::{run, DynValidator, Reconciler, Reconciliation};

// Re-export component types for convenience
pub use nodereg_core::{NodeRecord, NodeStatus, Registry, RegistryStore};
pub use nodereg_prober::{NodeProber, ProbeConfig, ProbeOutcome};

/// Result type for a registry update run.
pub type Result<T> = std::result::Result<T, ReconcileError>;
