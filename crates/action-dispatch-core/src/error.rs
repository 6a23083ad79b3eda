// crates/action-dispatch-core/src/error.rs
// ============================================================================
// Module: Action Errors
// Description: Failure values raised by base operations and collaborators.
// Purpose: Give handler failures a shape the classifier can inspect.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Base operations and the wrapped content API client fail with
//! [`ActionError`]. The error-handling middleware never matches on the variant
//! to decide what happened; it projects every error into a JSON shape with
//! [`ActionError::shape`] and classifies that shape. This keeps the taxonomy
//! driven by status codes and error-kind tags rather than Rust types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: API Errors
// ============================================================================

/// Error payload reported by the content API client.
///
/// # Invariants
/// - Fields mirror the wire error body; absent fields stay `None`/empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code when the failure came from an HTTP response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Error-kind tag reported by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Nested error detail entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
}

impl ApiError {
    /// Creates an API error with the given HTTP status.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Sets the error-kind tag.
    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the human-readable message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Appends an error detail entry.
    #[must_use]
    pub fn detail(mut self, detail: Value) -> Self {
        self.errors.push(detail);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.code, self.status) {
            (Some(message), _, _) => f.write_str(message),
            (None, Some(code), Some(status)) => write!(f, "{code} (status {status})"),
            (None, Some(code), None) => f.write_str(code),
            (None, None, Some(status)) => write!(f, "request failed with status {status}"),
            (None, None, None) => f.write_str("request failed"),
        }
    }
}

// ============================================================================
// SECTION: Action Errors
// ============================================================================

/// Failure raised below the error-handling middleware.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// Failure reported by the content API client.
    #[error("{0}")]
    Api(ApiError),
    /// Lookup succeeded but returned nothing.
    #[error("{resource_type} not found")]
    NotFound {
        /// Resource type label.
        resource_type: String,
        /// Identifier that was looked up, when known.
        resource_id: Option<String>,
    },
    /// Bare message failure.
    #[error("{0}")]
    Message(String),
    /// Arbitrary JSON failure payload.
    #[error("{0}")]
    Payload(Value),
    /// Operation result could not be serialized into the envelope.
    #[error("result serialization failed: {0}")]
    Serialization(String),
}

impl ActionError {
    /// Builds a not-found error for a resource.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, resource_id: Option<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            resource_id,
        }
    }

    /// Returns a stable label for the error's Rust-side origin.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Api(_) => "ApiError",
            Self::NotFound {
                ..
            } => "NotFoundError",
            Self::Message(_) => "MessageError",
            Self::Payload(_) => "PayloadError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// Projects the error into the JSON shape inspected by the classifier.
    #[must_use]
    pub fn shape(&self) -> Value {
        match self {
            Self::Api(error) => serde_json::to_value(error).unwrap_or(Value::Null),
            Self::NotFound {
                resource_type,
                resource_id,
            } => {
                let mut shape = Map::new();
                shape.insert("status".to_string(), Value::from(404_u16));
                shape.insert("code".to_string(), Value::from("NOT_FOUND"));
                shape.insert("message".to_string(), Value::from(self.to_string()));
                shape.insert("resource_type".to_string(), Value::from(resource_type.as_str()));
                if let Some(id) = resource_id {
                    shape.insert("resource_id".to_string(), Value::from(id.as_str()));
                }
                Value::Object(shape)
            }
            Self::Message(message) => Value::String(message.clone()),
            Self::Payload(payload) => payload.clone(),
            Self::Serialization(message) => {
                let mut shape = Map::new();
                shape.insert("message".to_string(), Value::from(self.to_string()));
                shape.insert("detail".to_string(), Value::from(message.as_str()));
                Value::Object(shape)
            }
        }
    }
}

impl From<ApiError> for ActionError {
    fn from(error: ApiError) -> Self {
        Self::Api(error)
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
