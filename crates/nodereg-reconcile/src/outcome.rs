//! Per-node outcomes and the run report.

use nodereg_core::{EndpointRole, MigrationError, NodeStatus, SchemaViolation};
use thiserror::Error;

/// What happened to one node during a run.
///
/// Every variant except `Online` left the node's data at its pre-run value;
/// only the `status` field records the failure.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// New data was validated and committed.
    Online {
        /// Committed version string.
        version: String,
        /// Number of committed services.
        services: usize,
    },

    /// The node could not be reached.
    Offline {
        /// Transport error or missing endpoint.
        reason: String,
    },

    /// The node answered with a body that is not a JSON object.
    Unresponsive {
        /// Which resource answered badly.
        role: EndpointRole,
        /// Excerpt of the offending body.
        body: String,
    },

    /// The node's data was rejected.
    InvalidConfiguration {
        /// Why it was rejected.
        cause: InvalidCause,
    },
}

impl NodeOutcome {
    /// The status this outcome records on the node.
    pub fn status(&self) -> NodeStatus {
        match self {
            Self::Online { .. } => NodeStatus::Online,
            Self::Offline { .. } => NodeStatus::Offline,
            Self::Unresponsive { .. } => NodeStatus::Unresponsive,
            Self::InvalidConfiguration { .. } => NodeStatus::InvalidConfiguration,
        }
    }

    /// Returns true if the node's data was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Online { .. })
    }
}

impl std::fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online { version, services } => {
                write!(f, "online (version {}, {} services)", version, services)
            }
            Self::Offline { reason } => write!(f, "offline: {}", reason),
            Self::Unresponsive { role, body } => {
                write!(f, "unresponsive: {} body is not a JSON object: {:?}", role, body)
            }
            Self::InvalidConfiguration { cause } => write!(f, "invalid configuration: {}", cause),
        }
    }
}

/// Why fetched data was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidCause {
    /// A decoded body has a field of the wrong JSON type.
    #[error("{0}")]
    Payload(String),

    /// A migration step failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// The registry with this node's data substituted fails the schema.
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),
}

/// Ordered per-node outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    outcomes: Vec<(String, NodeOutcome)>,
}

impl RunReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a node's outcome.
    pub fn push(&mut self, name: impl Into<String>, outcome: NodeOutcome) {
        self.outcomes.push((name.into(), outcome));
    }

    /// Outcomes in processing order.
    pub fn outcomes(&self) -> &[(String, NodeOutcome)] {
        &self.outcomes
    }

    /// The outcome recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&NodeOutcome> {
        self.outcomes
            .iter()
            .find(|(node, _)| node == name)
            .map(|(_, outcome)| outcome)
    }

    /// Number of nodes that ended with `status`.
    pub fn count(&self, status: NodeStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.status() == status)
            .count()
    }

    /// Number of nodes processed.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if no node was processed.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} nodes:", self.len())?;
        for status in [
            NodeStatus::Online,
            NodeStatus::Offline,
            NodeStatus::Unresponsive,
            NodeStatus::InvalidConfiguration,
        ] {
            write!(f, " {} {}", self.count(status), status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status() {
        let online = NodeOutcome::Online {
            version: "1.0.0".to_string(),
            services: 2,
        };
        assert_eq!(online.status(), NodeStatus::Online);
        assert!(online.is_committed());

        let invalid = NodeOutcome::InvalidConfiguration {
            cause: InvalidCause::Payload("version is not a string".to_string()),
        };
        assert_eq!(invalid.status(), NodeStatus::InvalidConfiguration);
        assert!(!invalid.is_committed());
    }

    #[test]
    fn test_outcome_display() {
        let offline = NodeOutcome::Offline {
            reason: "connection refused".to_string(),
        };
        assert_eq!(offline.to_string(), "offline: connection refused");
    }

    #[test]
    fn test_report_counts() {
        let mut report = RunReport::new();
        report.push("a", NodeOutcome::Online { version: "1.0.0".into(), services: 0 });
        report.push("b", NodeOutcome::Offline { reason: "down".into() });
        report.push("c", NodeOutcome::Offline { reason: "down".into() });

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(NodeStatus::Online), 1);
        assert_eq!(report.count(NodeStatus::Offline), 2);
        assert_eq!(report.count(NodeStatus::Unresponsive), 0);
        assert_eq!(report.get("b").map(NodeOutcome::status), Some(NodeStatus::Offline));
        assert_eq!(
            report.to_string(),
            "3 nodes: 1 online 2 offline 0 unresponsive 0 invalid_configuration"
        );
    }
}
