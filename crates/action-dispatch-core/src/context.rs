// crates/action-dispatch-core/src/context.rs
// ============================================================================
// Module: Request Context
// Description: Per-request argument and error-context values.
// Purpose: Carry validated args and failure labels through one invocation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Values in this module are owned by a single in-flight request. The
//! [`ErrorContext`] stored on a composed handler is a template: every
//! invocation clones it, so a resource identifier recorded by one call is never
//! visible to another call running concurrently on the same handler.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Operation Metadata
// ============================================================================

/// Operation shape a composed handler was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Creates an entity.
    Create,
    /// Looks up a single entity.
    Retrieve,
    /// Updates an entity.
    Update,
    /// Deletes an entity.
    Delete,
    /// Lists entities.
    List,
    /// Caller-defined body.
    Custom,
}

impl OperationKind {
    /// Returns a stable label for the operation kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Retrieve => "retrieve",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Custom => "custom",
        }
    }
}

/// Descriptive metadata used to label a failure.
///
/// # Invariants
/// - `resource_id` is set at most once per invocation, before the base
///   operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Handler identity used as the message prefix.
    pub handler_name: String,
    /// Operation shape.
    pub operation: OperationKind,
    /// Resource type label (for example `record`).
    pub resource_type: String,
    /// Argument field holding the resource identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id_field: Option<String>,
    /// Resource identifier discovered for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ErrorContext {
    /// Creates an error context without a resource identifier.
    #[must_use]
    pub fn new(
        handler_name: impl Into<String>,
        operation: OperationKind,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            handler_name: handler_name.into(),
            operation,
            resource_type: resource_type.into(),
            resource_id_field: None,
            resource_id: None,
        }
    }

    /// Names the argument field that holds the resource identifier.
    #[must_use]
    pub fn with_resource_id_field(mut self, field: impl Into<String>) -> Self {
        self.resource_id_field = Some(field.into());
        self
    }

    /// Records the identifier of the entity this request targets.
    pub fn record_resource_id(&mut self, resource_id: impl Into<String>) {
        self.resource_id = Some(resource_id.into());
    }
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Caller-supplied API credential.
///
/// # Invariants
/// - The token is never rendered by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// Wraps a raw API token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for the client factory.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(<redacted>)")
    }
}

/// Fields every action schema shares.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonArgs {
    /// API token used to build the collaborator client.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Target environment selector.
    #[serde(default)]
    pub environment: Option<String>,
    /// Per-call debug flag.
    #[serde(default)]
    pub debug: bool,
}

/// Typed arguments produced by schema validation.
///
/// # Invariants
/// - Only constructed from input that passed the registered schema.
#[derive(Debug, Clone)]
pub struct ValidatedArgs<A> {
    /// Caller credential.
    pub credential: ApiCredential,
    /// Target environment selector.
    pub environment: Option<String>,
    /// Per-call debug flag.
    pub debug: bool,
    /// Action-specific typed parameters.
    pub params: A,
    /// Validated JSON with schema defaults applied.
    value: Value,
}

impl<A> ValidatedArgs<A> {
    /// Assembles validated args from their parts.
    pub(crate) fn new(
        credential: ApiCredential,
        common: CommonArgs,
        params: A,
        value: Value,
    ) -> Self {
        Self {
            credential,
            environment: common.environment,
            debug: common.debug,
            params,
            value,
        }
    }

    /// Returns the validated JSON the typed parameters were decoded from.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Reads a top-level field as an identifier string.
    #[must_use]
    pub fn field_str(&self, field: &str) -> Option<String> {
        match self.value.get(field)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

/// Returns true when the raw call args request debug output.
#[must_use]
pub fn debug_requested(args: &Value) -> bool {
    args.get("debug").and_then(Value::as_bool).unwrap_or(false)
}

// ============================================================================
// SECTION: Operation Context
// ============================================================================

/// Context handed to base operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Resource domain.
    pub domain: String,
    /// Action name.
    pub action: String,
    /// Handler identity.
    pub handler_name: String,
    /// Resource identifier recorded for this request.
    pub resource_id: Option<String>,
}
