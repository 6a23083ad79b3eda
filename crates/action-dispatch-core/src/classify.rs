// crates/action-dispatch-core/src/classify.rs
// ============================================================================
// Module: Error Classifier
// Description: Shape-based classification of handler failures.
// Purpose: Map any failure payload to one of five fixed error kinds.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Classifiers are pure predicates over a JSON error shape. They inspect the
//! `status`/`statusCode` number and the `code` error-kind tag (including tags
//! nested under `errors[].attributes.code`). Every predicate is total: strings,
//! numbers, arrays and `null` simply classify as [`ErrorKind::Generic`].
//!
//! ## Invariants
//! - Priority is fixed: authorization, not found, validation, version
//!   conflict, generic.
//! - Classification is deterministic for a given shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Error-kind tags signalling a rejected credential.
const AUTHORIZATION_CODES: &[&str] = &["INVALID_AUTHORIZATION_HEADER", "UNAUTHORIZED"];
/// Error-kind tags signalling a missing entity.
const NOT_FOUND_CODES: &[&str] = &["NOT_FOUND", "ITEM_NOT_FOUND"];
/// Error-kind tags signalling remotely rejected input.
const VALIDATION_CODES: &[&str] = &["VALIDATION_ERROR", "INVALID_FIELD"];
/// Error-kind tags signalling an optimistic-concurrency mismatch.
const VERSION_CONFLICT_CODES: &[&str] = &["STALE_ITEM_VERSION", "VERSION_CONFLICT"];
/// Fallback detail when a shape carries no text at all.
const UNKNOWN_ERROR_DETAIL: &str = "unknown error";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Closed set of failure classifications.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential rejected by the collaborator.
    Authorization,
    /// Target entity absent.
    NotFound,
    /// Input rejected, locally or remotely.
    Validation,
    /// Optimistic-concurrency mismatch.
    VersionConflict,
    /// Anything else.
    Generic,
}

impl ErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::VersionConflict => "version_conflict",
            Self::Generic => "generic",
        }
    }

    /// Parses a stable label back into a kind.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        [
            Self::Authorization,
            Self::NotFound,
            Self::Validation,
            Self::VersionConflict,
            Self::Generic,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == label)
    }
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when the shape describes a rejected credential.
#[must_use]
pub fn is_authorization_error(shape: &Value) -> bool {
    status_of(shape) == Some(401) || has_code(shape, AUTHORIZATION_CODES)
}

/// Returns true when the shape describes a missing entity.
#[must_use]
pub fn is_not_found_error(shape: &Value) -> bool {
    status_of(shape) == Some(404) || has_code(shape, NOT_FOUND_CODES)
}

/// Returns true when the shape describes remotely rejected input.
#[must_use]
pub fn is_validation_error(shape: &Value) -> bool {
    status_of(shape) == Some(422) || has_code(shape, VALIDATION_CODES)
}

/// Returns true when the shape describes an optimistic-concurrency mismatch.
#[must_use]
pub fn is_version_conflict_error(shape: &Value) -> bool {
    status_of(shape) == Some(409) || has_code(shape, VERSION_CONFLICT_CODES)
}

/// Classifies a failure shape in fixed priority order.
#[must_use]
pub fn classify_error(shape: &Value) -> ErrorKind {
    if is_authorization_error(shape) {
        ErrorKind::Authorization
    } else if is_not_found_error(shape) {
        ErrorKind::NotFound
    } else if is_validation_error(shape) {
        ErrorKind::Validation
    } else if is_version_conflict_error(shape) {
        ErrorKind::VersionConflict
    } else {
        ErrorKind::Generic
    }
}

// ============================================================================
// SECTION: Detail Extraction
// ============================================================================

/// Derives a human-readable detail string from a failure shape.
///
/// Nested `errors` entries win over the top-level message; shapes without
/// either fall back to their string form.
#[must_use]
pub fn extract_detailed_error_info(shape: &Value) -> String {
    if let Some(entries) = shape.get("errors").and_then(Value::as_array) {
        let details: Vec<String> = entries
            .iter()
            .filter_map(describe_entry)
            .filter(|detail| !detail.trim().is_empty())
            .collect();
        if !details.is_empty() {
            return details.join("; ");
        }
    }
    for key in ["message", "detail", "error"] {
        if let Some(text) = shape.get(key).and_then(Value::as_str)
            && !text.trim().is_empty()
        {
            return text.to_string();
        }
    }
    match shape {
        Value::String(text) if !text.trim().is_empty() => text.clone(),
        Value::String(_) | Value::Null => UNKNOWN_ERROR_DETAIL.to_string(),
        other => other.to_string(),
    }
}

/// Renders one nested error detail entry.
fn describe_entry(entry: &Value) -> Option<String> {
    match entry {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => {
            if let Some(message) = map.get("message").and_then(Value::as_str) {
                return Some(match map.get("field").and_then(Value::as_str) {
                    Some(field) => format!("{field}: {message}"),
                    None => message.to_string(),
                });
            }
            if let Some(attributes) = map.get("attributes") {
                return Some(describe_attributes(attributes));
            }
            Some(entry.to_string())
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Renders a JSON:API style `attributes` block.
fn describe_attributes(attributes: &Value) -> String {
    let code = attributes.get("code").and_then(Value::as_str);
    let details = attributes.get("details");
    let field = details.and_then(|value| value.get("field")).and_then(Value::as_str);
    let messages: Vec<&str> = details
        .and_then(|value| value.get("messages"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let reason = if messages.is_empty() {
        details
            .and_then(|value| value.get("code"))
            .and_then(Value::as_str)
            .or(code)
            .map(str::to_string)
            .or_else(|| details.map(Value::to_string))
            .unwrap_or_else(|| attributes.to_string())
    } else {
        messages.join(", ")
    };
    match field {
        Some(field) => format!("{field}: {reason}"),
        None => reason,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a numeric status from `status` or `statusCode`.
fn status_of(shape: &Value) -> Option<u64> {
    ["status", "statusCode", "status_code"].iter().find_map(|key| {
        let value = shape.get(*key)?;
        value.as_u64().or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
    })
}

/// Returns true when the top-level or a nested error code matches.
fn has_code(shape: &Value, codes: &[&str]) -> bool {
    let top_level = shape.get("code").and_then(Value::as_str);
    if top_level.is_some_and(|code| codes.contains(&code)) {
        return true;
    }
    shape.get("errors").and_then(Value::as_array).is_some_and(|entries| {
        entries.iter().any(|entry| {
            let nested = entry
                .get("attributes")
                .and_then(|attributes| attributes.get("code"))
                .or_else(|| entry.get("code"))
                .and_then(Value::as_str);
            nested.is_some_and(|code| codes.contains(&code))
        })
    })
}
