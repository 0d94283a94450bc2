//! # Migration Chain
//!
//! Nodes running older software report data in older shapes. Before a node's
//! freshly fetched data is validated against the current schema, it is passed
//! through every registered [`Migration`] in registration order.
//!
//! ## Rules for Steps
//!
//! - A step only reads and writes the one [`NodeRecord`] it is given.
//! - A step is a no-op on data already in current shape, so the chain as a
//!   whole is idempotent.
//! - A step that cannot make sense of its input returns a
//!   [`MigrationError`]; the caller discards the partially migrated record.
//!
//! When a backwards-incompatible schema change lands, add a variant here and
//! append it to [`MigrationChain::current`].
//!
//! ## Example
//!
//! ```rust
//! use nodereg_core::{MigrationChain, NodeRecord};
//! use serde_json::json;
//!
//! let mut record = NodeRecord::with_url("https://node.example.com");
//! record.services = Some(vec![json!({"name": "wps", "keywords": ["service-wps"]})]);
//!
//! MigrationChain::current().apply(&mut record)?;
//! assert_eq!(record.services.unwrap()[0]["types"], json!(["wps"]));
//! # Ok::<(), nodereg_core::MigrationError>(())
//! ```

use crate::models::NodeRecord;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

/// Keyword to service type, for services predating the `types` field.
const KEYWORD_TYPES: &[(&str, &str)] = &[
    ("catalog", "catalog"),
    ("data", "data"),
    ("jupyterhub", "jupyterhub"),
    ("other", "other"),
    ("service-wps", "wps"),
    ("service-wms", "wms"),
    ("service-wfs", "wfs"),
    ("service-wcs", "wcs"),
    ("service-ogcapi_processes", "ogcapi_processes"),
];

/// Type assigned when none of a service's keywords map to a type.
const FALLBACK_TYPE: &str = "other";

/// A migration step failed; the node's data cannot be brought to current shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("migration '{step}' failed: {reason}")]
pub struct MigrationError {
    /// Name of the failing step.
    pub step: &'static str,
    /// What the step could not handle.
    pub reason: String,
}

impl MigrationError {
    fn new(step: &'static str, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}

/// A named transformation from an older data shape to a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// Derives service `types` from legacy `keywords` (schema 1.3.0).
    ///
    /// Precondition: every service is an object carrying `types`, or
    /// `keywords` as an array of strings.
    ///
    /// Postcondition: every service carries a `types` array. Services that
    /// already had `types` are untouched; for the others, keywords are mapped
    /// through a fixed table, unmapped keywords are dropped, and an empty
    /// result becomes `["other"]`.
    KeywordsToTypes,
}

impl Migration {
    /// Stable name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Migration::KeywordsToTypes => "keywords_to_types",
        }
    }

    /// Applies this step to one node's data in place.
    pub fn apply(&self, record: &mut NodeRecord) -> Result<(), MigrationError> {
        match self {
            Migration::KeywordsToTypes => keywords_to_types(self.name(), record),
        }
    }
}

fn keywords_to_types(step: &'static str, record: &mut NodeRecord) -> Result<(), MigrationError> {
    let Some(services) = record.services.as_mut() else {
        return Ok(());
    };

    for (index, service) in services.iter_mut().enumerate() {
        let service = service
            .as_object_mut()
            .ok_or_else(|| MigrationError::new(step, format!("service {index} is not an object")))?;

        if service.contains_key("types") {
            continue;
        }

        let keywords = service
            .get("keywords")
            .ok_or_else(|| {
                MigrationError::new(step, format!("service {index} has neither types nor keywords"))
            })?
            .as_array()
            .ok_or_else(|| MigrationError::new(step, format!("service {index} keywords is not an array")))?;

        let mut types = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.as_str().ok_or_else(|| {
                MigrationError::new(step, format!("service {index} has a non-string keyword"))
            })?;
            if let Some((_, kind)) = KEYWORD_TYPES.iter().find(|(k, _)| *k == keyword) {
                types.push(Value::from(*kind));
            }
        }
        if types.is_empty() {
            types.push(Value::from(FALLBACK_TYPE));
        }

        trace!(step, service = index, ?types, "derived service types from keywords");
        service.insert("types".to_string(), Value::Array(types));
    }

    Ok(())
}

/// The ordered list of migrations applied to every node's fetched data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationChain {
    steps: Vec<Migration>,
}

impl MigrationChain {
    /// The chain for the current schema generation.
    pub fn current() -> Self {
        Self::from_steps(vec![Migration::KeywordsToTypes])
    }

    /// A chain with explicit steps, applied in the given order.
    pub fn from_steps(steps: Vec<Migration>) -> Self {
        Self { steps }
    }

    /// The registered steps in application order.
    pub fn steps(&self) -> &[Migration] {
        &self.steps
    }

    /// Applies every step in order, stopping at the first failure.
    ///
    /// On error `record` may be partially migrated; callers must discard it.
    pub fn apply(&self, record: &mut NodeRecord) -> Result<(), MigrationError> {
        for step in &self.steps {
            step.apply(record)?;
        }
        Ok(())
    }
}

impl Default for MigrationChain {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(services: Vec<Value>) -> NodeRecord {
        let mut record = NodeRecord::with_url("https://node.example.com");
        record.services = Some(services);
        record
    }

    fn types_of(record: &NodeRecord) -> Vec<Value> {
        record
            .services
            .as_ref()
            .unwrap()
            .iter()
            .map(|service| service["types"].clone())
            .collect()
    }

    #[test]
    fn test_known_keyword_maps_to_type() {
        let mut record = record_with(vec![json!({"name": "a", "keywords": ["service-wps"]})]);
        MigrationChain::current().apply(&mut record).unwrap();
        assert_eq!(types_of(&record), vec![json!(["wps"])]);
    }

    #[test]
    fn test_unknown_keyword_defaults_to_other() {
        let mut record = record_with(vec![json!({"name": "a", "keywords": ["totally-unknown"]})]);
        MigrationChain::current().apply(&mut record).unwrap();
        assert_eq!(types_of(&record), vec![json!(["other"])]);
    }

    #[test]
    fn test_unmapped_keywords_dropped_and_order_kept() {
        let mut record = record_with(vec![json!({
            "name": "geoserver",
            "keywords": ["data", "some-other-keyword", "service-wms", "service-wfs"]
        })]);
        MigrationChain::current().apply(&mut record).unwrap();
        assert_eq!(types_of(&record), vec![json!(["data", "wms", "wfs"])]);
    }

    #[test]
    fn test_existing_types_untouched() {
        let services = vec![json!({
            "name": "weaver",
            "types": ["ogcapi_processes"],
            "keywords": ["service-wps"]
        })];
        let mut record = record_with(services.clone());
        MigrationChain::current().apply(&mut record).unwrap();
        assert_eq!(record.services, Some(services));
    }

    #[test]
    fn test_chain_is_idempotent() {
        let mut record = record_with(vec![
            json!({"name": "a", "keywords": ["catalog", "jupyterhub"]}),
            json!({"name": "b", "keywords": []}),
        ]);
        let chain = MigrationChain::current();
        chain.apply(&mut record).unwrap();
        let once = record.clone();
        chain.apply(&mut record).unwrap();
        assert_eq!(record, once);
        assert_eq!(types_of(&record), vec![json!(["catalog", "jupyterhub"]), json!(["other"])]);
    }

    #[test]
    fn test_no_services_is_noop() {
        let mut record = NodeRecord::with_url("https://node.example.com");
        MigrationChain::current().apply(&mut record).unwrap();
        assert!(record.services.is_none());
    }

    #[test]
    fn test_missing_keywords_fails() {
        let mut record = record_with(vec![json!({"bad_key": "some_value"})]);
        let err = MigrationChain::current().apply(&mut record).unwrap_err();
        assert_eq!(err.step, "keywords_to_types");
        assert!(err.reason.contains("neither types nor keywords"));
    }

    #[test]
    fn test_non_object_service_fails() {
        let mut record = record_with(vec![json!("geoserver")]);
        let err = MigrationChain::current().apply(&mut record).unwrap_err();
        assert!(err.to_string().contains("service 0 is not an object"));
    }

    #[test]
    fn test_non_string_keyword_fails() {
        let mut record = record_with(vec![json!({"name": "a", "keywords": ["data", 7]})]);
        assert!(MigrationChain::current().apply(&mut record).is_err());
    }

    #[test]
    fn test_empty_chain() {
        let mut record = record_with(vec![json!({"bad_key": 1})]);
        let chain = MigrationChain::from_steps(Vec::new());
        chain.apply(&mut record).unwrap();
        assert!(chain.steps().is_empty());
    }
}
