//! # Core Data Models for the Node Registry
//!
//! This module defines the document persisted as the registry file: a JSON
//! object mapping node names to [`NodeRecord`]s. The types are deliberately
//! permissive where the data originates from remote nodes (services are kept
//! as raw JSON until whole-document validation has judged them) and strict
//! where the registry itself owns the value (status, timestamps).
//!
//! ## Shape Generations
//!
//! Two address shapes coexist in registries written by different schema
//! generations:
//!
//! | Generation | Address field | Endpoints |
//! |------------|---------------|-----------|
//! | Oldest | `url` | `<url>/version`, `<url>/services` |
//! | Newest | `links` | relations `version` and `collection` |
//!
//! See [`crate::endpoints`] for how a record's address is resolved.
//!
//! ## Volatile vs. Identity Fields
//!
//! A record is created externally with identity fields only (`url`/`links`
//! plus whatever descriptive keys the operator adds). The update run owns the
//! volatile fields: `status`, `version`, `services`, `last_updated`,
//! `date_added`. Keys the model does not know about are carried through
//! untouched in [`NodeRecord::extra`].

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version recorded when a node's version resource omits the field.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Outcome signal of the last update attempt for a node.
///
/// Serialized in snake_case, matching the enumeration in the registry schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Fetch, migration and validation all succeeded.
    Online,

    /// A network connection to the node could not be established.
    Offline,

    /// The node answered, but with a body that is not the expected JSON.
    Unresponsive,

    /// The node's data failed migration or schema validation.
    InvalidConfiguration,
}

impl NodeStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
            NodeStatus::Unresponsive => "unresponsive",
            NodeStatus::InvalidConfiguration => "invalid_configuration",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed hyperlink, as found in a node's `links` table or a service's links.
///
/// # Example
///
/// ```rust
/// use nodereg_core::Link;
///
/// let link: Link = serde_json::from_str(
///     r#"{"rel": "version", "href": "https://node.example.com/version", "title": "v"}"#,
/// ).unwrap();
/// assert_eq!(link.rel, "version");
/// assert_eq!(link.extra["title"], "v");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Link relation (`version`, `collection`, `service`, `service-doc`, ...).
    pub rel: String,

    /// Target URL.
    pub href: String,

    /// Media type of the target, if advertised.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Any other link attributes, preserved verbatim.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Link {
    /// Creates a link with no media type.
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            extra: IndexMap::new(),
        }
    }
}

/// One entry of the registry: a federated node and what it last reported.
///
/// Every field is optional because a freshly registered node carries only its
/// address, and because both shape generations must round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Base URL (oldest shape generation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Link table keyed by relation (newest shape generation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    /// Outcome of the last update attempt; unset until the first run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,

    /// Version string reported by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Services reported by the node, kept as raw JSON objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Value>>,

    /// When the record was last successfully committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    /// When the record was first successfully committed. Never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<Utc>>,

    /// Keys not modelled above (descriptions, icons, contact info, ...).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl NodeRecord {
    /// A record addressed by a flat base URL.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// A record addressed by a link table.
    pub fn with_links(links: Vec<Link>) -> Self {
        Self {
            links: Some(links),
            ..Self::default()
        }
    }

    /// Typed views of the services that fit the descriptor shape.
    pub fn service_descriptors(&self) -> Vec<ServiceDescriptor> {
        self.services
            .iter()
            .flatten()
            .filter_map(ServiceDescriptor::from_value)
            .collect()
    }
}

/// The registry document: node name to record, in insertion order.
///
/// Iteration order only affects log ordering; correctness never depends on it.
///
/// # Example
///
/// ```rust
/// use nodereg_core::{NodeRecord, Registry};
///
/// let mut registry = Registry::new();
/// registry.insert("alpha", NodeRecord::with_url("https://alpha.example.com"));
/// registry.insert("beta", NodeRecord::with_url("https://beta.example.com"));
///
/// let names: Vec<_> = registry.names().collect();
/// assert_eq!(names, ["alpha", "beta"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    nodes: IndexMap<String, NodeRecord>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a node, keeping its original position if present.
    pub fn insert(&mut self, name: impl Into<String>, record: NodeRecord) -> Option<NodeRecord> {
        self.nodes.insert(name.into(), record)
    }

    /// Looks up a node by name.
    pub fn get(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(name)
    }

    /// Iterates over `(name, record)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeRecord)> {
        self.nodes.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Node names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the registry has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The registry as a JSON document, with `name`'s record replaced by
    /// `candidate`. The registry itself is not modified.
    pub fn to_value_with(
        &self,
        name: &str,
        candidate: &NodeRecord,
    ) -> serde_json::Result<Value> {
        let mut document = serde_json::Map::with_capacity(self.nodes.len());
        for (node, record) in &self.nodes {
            let record = if node == name { candidate } else { record };
            document.insert(node.clone(), serde_json::to_value(record)?);
        }
        Ok(Value::Object(document))
    }
}

impl FromIterator<(String, NodeRecord)> for Registry {
    fn from_iter<I: IntoIterator<Item = (String, NodeRecord)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Registry {
    type Item = (String, NodeRecord);
    type IntoIter = indexmap::map::IntoIter<String, NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Read-only typed view of one service a node advertises.
///
/// Services are stored raw on [`NodeRecord`]; this view exists for consumers
/// that want to present them. Entries that do not fit are skipped rather than
/// reported, since the schema, not this type, is the authority on validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name, unique within a node.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Service links; valid data has at least `service` and `service-doc`.
    #[serde(default)]
    pub links: Vec<Link>,

    /// Enumerated service types (current generation).
    #[serde(default)]
    pub types: Vec<String>,

    /// Free-form keywords (older generation; mapped onto `types`).
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ServiceDescriptor {
    /// Parses a raw service entry, returning `None` if it does not fit.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// The link with the given relation, if any.
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        let value = serde_json::to_value(NodeStatus::InvalidConfiguration).unwrap();
        assert_eq!(value, json!("invalid_configuration"));

        let parsed: NodeStatus = serde_json::from_value(json!("unresponsive")).unwrap();
        assert_eq!(parsed, NodeStatus::Unresponsive);
        assert_eq!(NodeStatus::Offline.to_string(), "offline");
    }

    #[test]
    fn test_initial_record_has_no_volatile_fields() {
        let record: NodeRecord = serde_json::from_value(json!({
            "url": "https://node.example.com",
            "description": "A test node"
        }))
        .unwrap();

        assert_eq!(record.url.as_deref(), Some("https://node.example.com"));
        assert!(record.status.is_none());
        assert!(record.version.is_none());
        assert!(record.services.is_none());
        assert!(record.last_updated.is_none());
        assert_eq!(record.extra["description"], json!("A test node"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(
            back,
            json!({"url": "https://node.example.com", "description": "A test node"})
        );
    }

    #[test]
    fn test_unknown_keys_survive() {
        let raw = json!({
            "links": [
                {"rel": "version", "href": "https://n/version", "type": "application/json", "hreflang": "en"}
            ],
            "status": "online",
            "icon_url": "https://n/icon.png",
            "support_contact": "ops@example.com"
        });
        let record: NodeRecord = serde_json::from_value(raw.clone()).unwrap();

        let links = record.links.as_ref().unwrap();
        assert_eq!(links[0].media_type.as_deref(), Some("application/json"));
        assert_eq!(links[0].extra["hreflang"], json!("en"));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry: Registry = serde_json::from_str(
            r#"{"zeta": {"url": "https://z"}, "alpha": {"url": "https://a"}, "mid": {"url": "https://m"}}"#,
        )
        .unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_to_value_with_substitutes_one_node() {
        let mut registry = Registry::new();
        registry.insert("a", NodeRecord::with_url("https://a"));
        registry.insert("b", NodeRecord::with_url("https://b"));

        let mut candidate = NodeRecord::with_url("https://b");
        candidate.version = Some("1.0.0".to_string());

        let doc = registry.to_value_with("b", &candidate).unwrap();
        assert_eq!(doc["b"]["version"], json!("1.0.0"));
        assert!(doc["a"].get("version").is_none());
        assert!(registry.get("b").unwrap().version.is_none());
    }

    #[test]
    fn test_service_descriptors_skip_misfits() {
        let mut record = NodeRecord::with_url("https://n");
        record.services = Some(vec![
            json!({
                "name": "geoserver",
                "description": "Geospatial data",
                "types": ["data", "wms"],
                "links": [
                    {"rel": "service", "href": "https://n/geoserver/"},
                    {"rel": "service-doc", "href": "https://docs.geoserver.org/"}
                ]
            }),
            json!({"bad_key": "some_value"}),
        ]);

        let services = record.service_descriptors();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "geoserver");
        assert_eq!(
            services[0].link("service-doc").map(|l| l.href.as_str()),
            Some("https://docs.geoserver.org/")
        );
    }
}
