// crates/action-dispatch-core/src/registry.rs
// ============================================================================
// Module: Schema Registry
// Description: Action argument schemas keyed by domain and action name.
// Purpose: Validate and parse untyped call args at the dispatch boundary.
// Dependencies: jsonschema, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The schema registry maps `(domain, name)` to a compiled JSON Schema
//! (Draft 2020-12) plus optional description text. Domain owners register
//! their schemas during startup through `&mut self`; the registry is then
//! frozen into a [`SharedSchemaRegistry`] and only read afterwards. Writes
//! cannot happen once routers hold the shared handle, so reads need no lock.
//!
//! [`SchemaRegistry::validate`] never fails: a missing schema is reported as a
//! validation failure naming the `domain:name` key. [`SchemaRegistry::parse`]
//! returns the typed value or a [`RegistryError`].
//!
//! ## Invariants
//! - At most one schema per `(domain, name)`; the last registration wins.
//! - Schemas are compiled at registration, so lookups never see a schema that
//!   fails to compile.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::Draft;
use jsonschema::Validator;
use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shared, frozen schema registry handle.
pub type SharedSchemaRegistry = Arc<SchemaRegistry>;

/// Registry key for one action schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaKey {
    /// Resource domain.
    pub domain: String,
    /// Action name.
    pub name: String,
}

impl SchemaKey {
    /// Creates a schema key.
    #[must_use]
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.name)
    }
}

/// One registered schema with its compiled validators.
struct SchemaEntry {
    /// Raw schema document.
    schema: Value,
    /// Optional description text.
    description: Option<String>,
    /// Whole-document validator.
    validator: Validator,
}

/// Single validation issue attributed to a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Field path (empty for the document root).
    pub path: String,
    /// Failure message.
    pub message: String,
}

impl ValidationIssue {
    /// Creates a validation issue.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Failed validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Summary error message.
    pub error: String,
    /// Per-field issues.
    pub issues: Vec<ValidationIssue>,
    /// Schema description, when registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ValidationFailure {
    /// Formats the issues as one bullet line per issue.
    #[must_use]
    pub fn formatted_errors(&self) -> String {
        self.issues.iter().map(|issue| format!("- {issue}")).collect::<Vec<_>>().join("\n")
    }
}

/// Non-throwing validation outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaValidation {
    /// Input satisfied the schema; `data` has schema defaults applied.
    Valid {
        /// Validated data.
        data: Value,
    },
    /// Input failed the schema or the schema is missing.
    Invalid(ValidationFailure),
}

impl SchemaValidation {
    /// Returns true when validation succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No schema registered for the key.
    #[error("schema not registered: {key}")]
    MissingSchema {
        /// Missing key.
        key: SchemaKey,
    },
    /// Schema document failed to compile.
    #[error("schema compilation failed for {key}: {error}")]
    SchemaCompile {
        /// Offending key.
        key: SchemaKey,
        /// Compiler error details.
        error: String,
    },
    /// Input failed validation.
    #[error("invalid parameters for {key}: {}", failure.formatted_errors())]
    Invalid {
        /// Validated key.
        key: SchemaKey,
        /// Validation details.
        failure: ValidationFailure,
    },
    /// Validated input could not be decoded into the requested type.
    #[error("parameters for {key} could not be decoded: {error}")]
    Decode {
        /// Validated key.
        key: SchemaKey,
        /// Decoder error details.
        error: String,
    },
}

impl RegistryError {
    /// Returns the stable error code for this registry error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingSchema {
                ..
            } => "schema_missing",
            Self::SchemaCompile {
                ..
            } => "schema_compile_failed",
            Self::Invalid {
                ..
            } => "params_invalid",
            Self::Decode {
                ..
            } => "params_decode_failed",
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Process-wide registry of action argument schemas.
#[derive(Default)]
pub struct SchemaRegistry {
    /// Registered entries.
    entries: BTreeMap<SchemaKey, SchemaEntry>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the schema for `(domain, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SchemaCompile`] when the schema is invalid.
    pub fn register(
        &mut self,
        domain: &str,
        name: &str,
        schema: Value,
        description: Option<&str>,
    ) -> Result<(), RegistryError> {
        let key = SchemaKey::new(domain, name);
        let validator = compile_schema(&schema).map_err(|error| RegistryError::SchemaCompile {
            key: key.clone(),
            error,
        })?;
        self.entries.insert(
            key,
            SchemaEntry {
                schema,
                description: description.map(str::to_string),
                validator,
            },
        );
        Ok(())
    }

    /// Registers every `(name, schema)` pair under `domain`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`]; earlier pairs stay registered.
    pub fn register_bulk<N, I>(&mut self, domain: &str, schemas: I) -> Result<(), RegistryError>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Value)>,
    {
        for (name, schema) in schemas {
            self.register(domain, name.as_ref(), schema, None)?;
        }
        Ok(())
    }

    /// Returns the raw schema for `(domain, name)`.
    #[must_use]
    pub fn get(&self, domain: &str, name: &str) -> Option<&Value> {
        self.entry(domain, name).map(|entry| &entry.schema)
    }

    /// Returns true when a schema is registered for `(domain, name)`.
    #[must_use]
    pub fn has(&self, domain: &str, name: &str) -> bool {
        self.entry(domain, name).is_some()
    }

    /// Removes the schema for `(domain, name)`; returns whether one existed.
    pub fn unregister(&mut self, domain: &str, name: &str) -> bool {
        self.entries.remove(&SchemaKey::new(domain, name)).is_some()
    }

    /// Lists every registered key in sorted order.
    #[must_use]
    pub fn list_schemas(&self) -> Vec<SchemaKey> {
        self.entries.keys().cloned().collect()
    }

    /// Lists the action names registered under `domain`, sorted.
    #[must_use]
    pub fn list_schemas_by_domain(&self, domain: &str) -> Vec<String> {
        self.entries.keys().filter(|key| key.domain == domain).map(|key| key.name.clone()).collect()
    }

    /// Returns the description registered for `(domain, name)`.
    #[must_use]
    pub fn get_description(&self, domain: &str, name: &str) -> Option<&str> {
        self.entry(domain, name).and_then(|entry| entry.description.as_deref())
    }

    /// Validates `data` against the schema for `(domain, name)` without failing.
    #[must_use]
    pub fn validate(&self, domain: &str, name: &str, data: &Value) -> SchemaValidation {
        let Some(entry) = self.entry(domain, name) else {
            let key = SchemaKey::new(domain, name);
            return SchemaValidation::Invalid(ValidationFailure {
                error: format!("schema not registered: {key}"),
                issues: vec![ValidationIssue::new("", format!("no schema registered for {key}"))],
                description: None,
            });
        };
        let data = apply_defaults(&entry.schema, data);
        if entry.validator.is_valid(&data) {
            return SchemaValidation::Valid {
                data,
            };
        }
        SchemaValidation::Invalid(ValidationFailure {
            error: format!("validation failed for {domain}:{name}"),
            issues: collect_issues(entry, &data),
            description: entry.description.clone(),
        })
    }

    /// Validates `data` and returns it with schema defaults applied.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the schema is missing or validation fails.
    pub fn parse_value(
        &self,
        domain: &str,
        name: &str,
        data: &Value,
    ) -> Result<Value, RegistryError> {
        if !self.has(domain, name) {
            return Err(RegistryError::MissingSchema {
                key: SchemaKey::new(domain, name),
            });
        }
        match self.validate(domain, name, data) {
            SchemaValidation::Valid {
                data,
            } => Ok(data),
            SchemaValidation::Invalid(failure) => Err(RegistryError::Invalid {
                key: SchemaKey::new(domain, name),
                failure,
            }),
        }
    }

    /// Validates `data` and decodes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the schema is missing, validation fails,
    /// or the validated value does not decode into `T`.
    pub fn parse<T: DeserializeOwned>(
        &self,
        domain: &str,
        name: &str,
        data: &Value,
    ) -> Result<T, RegistryError> {
        let value = self.parse_value(domain, name, data)?;
        serde_json::from_value(value).map_err(|err| RegistryError::Decode {
            key: SchemaKey::new(domain, name),
            error: err.to_string(),
        })
    }

    /// Freezes the registry into a shared read-only handle.
    #[must_use]
    pub fn freeze(self) -> SharedSchemaRegistry {
        Arc::new(self)
    }

    /// Looks up an entry by key parts.
    fn entry(&self, domain: &str, name: &str) -> Option<&SchemaEntry> {
        self.entries.get(&SchemaKey::new(domain, name))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles a JSON schema for validation.
fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("invalid schema: {err}"))
}

/// Fills missing top-level properties with their schema defaults.
fn apply_defaults(schema: &Value, data: &Value) -> Value {
    let (Some(object), Some(properties)) =
        (data.as_object(), schema.get("properties").and_then(Value::as_object))
    else {
        return data.clone();
    };
    let mut filled: Map<String, Value> = object.clone();
    for (name, property) in properties {
        if !filled.contains_key(name)
            && let Some(default) = property.get("default")
        {
            filled.insert(name.clone(), default.clone());
        }
    }
    Value::Object(filled)
}

/// Attributes every validation failure to its field path.
///
/// Missing required properties are reported on the property itself; other
/// failures use the instance location. Duplicate issues are dropped.
fn collect_issues(entry: &SchemaEntry, data: &Value) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = Vec::new();
    for error in entry.validator.iter_errors(data) {
        let location = field_path(error.instance_path().as_str());
        let issue = match error.kind() {
            ValidationErrorKind::Required {
                property,
            } => {
                let name = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                let path = if location.is_empty() {
                    name
                } else {
                    format!("{location}.{name}")
                };
                ValidationIssue::new(path, "is required")
            }
            _ => ValidationIssue::new(location, error.to_string()),
        };
        if !issues.contains(&issue) {
            issues.push(issue);
        }
    }
    if issues.is_empty() {
        issues.push(ValidationIssue::new("", "input does not match schema"));
    }
    issues
}

/// Renders a JSON pointer as a dotted field path (empty for the root).
fn field_path(pointer: &str) -> String {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}
