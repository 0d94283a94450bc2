//! # nodereg-core - Registry Model, Migrations, Validation and Storage
//!
//! The node registry is a JSON document mapping federated node names to what
//! each node last reported about itself: its address, status, version and the
//! services it advertises. This crate holds everything about that document
//! that does not involve the network:
//!
//! 1. **Data model** ([`models`]) - [`Registry`], [`NodeRecord`],
//!    [`NodeStatus`], [`Link`] and the typed [`ServiceDescriptor`] view.
//!
//! 2. **Endpoint resolution** ([`endpoints`]) - where a node's version and
//!    services resources live, for both record shape generations.
//!
//! 3. **Migration chain** ([`migrations`]) - ordered, idempotent steps that
//!    bring data reported by older nodes up to the current schema.
//!
//! 4. **Schema validation** ([`schema`]) - whole-document validation against
//!    the registry JSON Schema, with located violations.
//!
//! 5. **Storage** ([`store`]) - atomic load/persist of the registry file.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        nodereg-core                           │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌──────────────┐   resolve    ┌──────────────────────────┐   │
//! │  │  NodeRecord  │─────────────▶│  LinkTable | UrlSuffix   │   │
//! │  │  (Registry)  │              └──────────────────────────┘   │
//! │  └──────┬───────┘                                             │
//! │         │ fetched data                                        │
//! │         ▼                                                     │
//! │  ┌──────────────┐  candidate   ┌──────────────────────────┐   │
//! │  │  Migration   │─────────────▶│   SchemaValidator        │   │
//! │  │    Chain     │   document   │   (whole registry)       │   │
//! │  └──────────────┘              └──────────────────────────┘   │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │  RegistryStore: load once, persist once (temp + rename) │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The update algorithm that drives these pieces lives in
//! `nodereg-reconcile`; fetching lives in `nodereg-prober`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nodereg_core::{JsonSchemaValidator, RegistryStore, SchemaValidator};
//!
//! let store = RegistryStore::new("node_registry.json");
//! let validator = JsonSchemaValidator::from_file("node_registry.schema.json")?;
//!
//! let document = store.load_raw()?;
//! for violation in validator.violations(&document) {
//!     eprintln!("{violation}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod endpoints;
pub mod error;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod store;

pub use endpoints::{EndpointRole, Endpoints, LinkTable, ResolveEndpoint, UnresolvedEndpoint, UrlSuffix};
pub use error::{SchemaError, StoreError};
pub use migrations::{Migration, MigrationChain, MigrationError};
pub use models::{Link, NodeRecord, NodeStatus, Registry, ServiceDescriptor, UNKNOWN_VERSION};
pub use schema::{JsonSchemaValidator, SchemaValidator, SchemaViolation};
pub use store::{load_schema, RegistryStore};
