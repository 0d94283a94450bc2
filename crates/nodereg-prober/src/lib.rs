//! # Node Prober
//!
//! Fetches the two resources every registered node serves: its version
//! descriptor and its services collection. The prober only reads; it never
//! touches the registry.
//!
//! ## Outcomes
//!
//! | Outcome | Trigger |
//! |---------|---------|
//! | [`ProbeOutcome::Fetched`] | Both bodies decoded as JSON objects |
//! | [`ProbeOutcome::Offline`] | Either request failed at the transport level, or the record does not advertise both endpoints |
//! | [`ProbeOutcome::Unresponsive`] | A connection succeeded but a body is not a JSON object |
//!
//! Both requests are always awaited before any body is looked at. A node
//! with one reachable and one unreachable endpoint is offline; partial
//! results are never used.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nodereg_core::NodeRecord;
//! use nodereg_prober::{HttpProber, NodeProber, ProbeConfig, ProbeOutcome};
//!
//! # async fn run() -> Result<(), nodereg_prober::ProbeError> {
//! let prober = HttpProber::new(&ProbeConfig::default())?;
//! let record = NodeRecord::with_url("https://node.example.com");
//!
//! match prober.probe("example", &record).await {
//!     ProbeOutcome::Fetched(payload) => println!("version body: {:?}", payload.version),
//!     ProbeOutcome::Offline { reason } => eprintln!("offline: {reason}"),
//!     ProbeOutcome::Unresponsive { role, body } => eprintln!("bad {role} body: {body}"),
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod http;

pub use config::ProbeConfig;
pub use http::HttpProber;

use async_trait::async_trait;
use nodereg_core::{EndpointRole, NodeRecord};
use serde_json::{Map, Value};
use thiserror::Error;

/// Decoded bodies of a node's two resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbePayload {
    /// Version descriptor body, e.g. `{"version": "1.2.3"}`.
    pub version: Map<String, Value>,

    /// Services collection body, e.g. `{"services": [...]}`.
    pub services: Map<String, Value>,
}

impl ProbePayload {
    /// Builds a payload from two JSON values, as a test double would.
    ///
    /// Returns `None` unless both values are objects.
    pub fn from_values(version: Value, services: Value) -> Option<Self> {
        match (version, services) {
            (Value::Object(version), Value::Object(services)) => Some(Self { version, services }),
            _ => None,
        }
    }
}

/// Result of probing one node.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Both resources answered with JSON objects.
    Fetched(ProbePayload),

    /// The node could not be reached.
    Offline {
        /// Transport error or missing endpoint, for diagnostics.
        reason: String,
    },

    /// The node answered with a body that is not a JSON object.
    Unresponsive {
        /// Which resource answered badly.
        role: EndpointRole,
        /// Excerpt of the offending body.
        body: String,
    },
}

impl ProbeOutcome {
    /// Returns true for [`ProbeOutcome::Fetched`].
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

/// Fetches a node's version and services resources.
#[async_trait]
pub trait NodeProber: Send + Sync {
    /// Probes the node named `name` at the address carried by `record`.
    async fn probe(&self, name: &str, record: &NodeRecord) -> ProbeOutcome;
}

/// Errors constructing a prober.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The HTTP client could not be built (TLS backend, invalid settings).
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type alias for prober construction.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_requires_objects() {
        assert!(ProbePayload::from_values(json!({"version": "1.0.0"}), json!({"services": []})).is_some());
        assert!(ProbePayload::from_values(json!("1.0.0"), json!({"services": []})).is_none());
        assert!(ProbePayload::from_values(json!({}), json!([])).is_none());
    }

    #[test]
    fn test_is_fetched() {
        let fetched = ProbeOutcome::Fetched(
            ProbePayload::from_values(json!({}), json!({})).unwrap(),
        );
        let offline = ProbeOutcome::Offline {
            reason: "connection refused".to_string(),
        };
        assert!(fetched.is_fetched());
        assert!(!offline.is_fetched());
    }
}
