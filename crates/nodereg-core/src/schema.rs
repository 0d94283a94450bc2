//! # Schema Validation
//!
//! The registry document as a whole must satisfy the registry JSON Schema
//! (2020-12 dialect) after every commit. Validation always runs against the
//! whole document rather than a single node, because the schema may carry
//! rules spanning several nodes.
//!
//! The [`SchemaValidator`] trait is the seam the reconciler depends on;
//! [`JsonSchemaValidator`] is the production implementation on top of the
//! `jsonschema` crate.
//!
//! ## Example
//!
//! ```rust
//! use nodereg_core::{JsonSchemaValidator, SchemaValidator};
//! use serde_json::json;
//!
//! let validator = JsonSchemaValidator::new(&json!({
//!     "type": "object",
//!     "additionalProperties": {
//!         "type": "object",
//!         "properties": {"version": {"type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$"}}
//!     }
//! }))?;
//!
//! assert!(validator.validate(&json!({"node": {"version": "1.2.3"}})).is_ok());
//!
//! let violation = validator.validate(&json!({"node": {"version": "abc123"}})).unwrap_err();
//! assert_eq!(violation.instance_path, "/node/version");
//! # Ok::<(), nodereg_core::SchemaError>(())
//! ```

use crate::error::SchemaError;
use crate::store::load_schema;
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// A located schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value in the document.
    pub instance_path: String,

    /// JSON pointer to the schema keyword that rejected it.
    pub schema_path: String,

    /// Human-readable description.
    pub message: String,
}

impl SchemaViolation {
    /// The node this violation is located in: the first segment of the
    /// instance path, if any.
    pub fn node(&self) -> Option<&str> {
        self.instance_path
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = if self.instance_path.is_empty() {
            "/"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "{} at {}", self.message, location)
    }
}

impl std::error::Error for SchemaViolation {}

/// Validates a candidate registry document.
pub trait SchemaValidator {
    /// Returns the first violation found, if any.
    fn validate(&self, document: &Value) -> Result<(), SchemaViolation>;

    /// Returns every violation found. Defaults to at most the first one.
    fn violations(&self, document: &Value) -> Vec<SchemaViolation> {
        self.validate(document).err().into_iter().collect()
    }
}

/// JSON Schema (2020-12) validator compiled once and reused for every check.
pub struct JsonSchemaValidator {
    validator: Validator,
}

impl JsonSchemaValidator {
    /// Compiles `schema`.
    ///
    /// Remote `$ref`s are resolved while compiling, which may block on the
    /// network; inside an async runtime, call this from a blocking task.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Compile`] if the schema is not valid or a
    /// reference cannot be resolved.
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Loads and compiles the schema file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let schema = load_schema(path)?;
        debug!(path = %path.display(), "compiling registry schema");
        Self::new(&schema)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, document: &Value) -> Result<(), SchemaViolation> {
        match self.validator.iter_errors(document).next() {
            Some(error) => Err(to_violation(&error)),
            None => Ok(()),
        }
    }

    fn violations(&self, document: &Value) -> Vec<SchemaViolation> {
        self.validator
            .iter_errors(document)
            .map(|error| to_violation(&error))
            .collect()
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("draft", &"2020-12")
            .finish()
    }
}

fn to_violation(error: &jsonschema::ValidationError<'_>) -> SchemaViolation {
    SchemaViolation {
        instance_path: error.instance_path.to_string(),
        schema_path: error.schema_path.to_string(),
        message: error.to_string(),
    }
}
