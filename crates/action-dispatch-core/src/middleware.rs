// crates/action-dispatch-core/src/middleware.rs
// ============================================================================
// Module: Handler Middleware
// Description: Schema validation and error normalization stages.
// Purpose: Guarantee validated input and envelope-only output for handlers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A composed handler is a stack of stages around a base operation:
//!
//! ```text
//! debug tracking -> error handling -> schema validation -> base operation
//! ```
//!
//! Inner stages return [`StageResult`]: a ready envelope, or a
//! [`ContextualError`] pairing the failure with the per-call
//! [`ErrorContext`]. [`with_error_handling`] is the single recovery boundary
//! and turns every failure into an error envelope, so a [`ComposedHandler`]
//! resolves to a [`ResponseEnvelope`] and never to an error.
//!
//! ## Invariants
//! - [`with_schema_validation`] never invokes its inner handler with input that
//!   failed the registered schema.
//! - [`with_error_handling`] clones its context template per call; concurrent
//!   calls never observe each other's resource identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;

use crate::classify::ErrorKind;
use crate::classify::classify_error;
use crate::classify::extract_detailed_error_info;
use crate::context::ApiCredential;
use crate::context::CommonArgs;
use crate::context::ErrorContext;
use crate::context::ValidatedArgs;
use crate::context::debug_requested;
use crate::debug::TraceMeta;
use crate::debug::unix_millis;
use crate::envelope::DebugError;
use crate::envelope::ResponseEnvelope;
use crate::error::ActionError;
use crate::registry::SchemaValidation;
use crate::registry::SharedSchemaRegistry;
use crate::registry::ValidationFailure;
use crate::registry::ValidationIssue;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire name of the credential field shared by every action schema.
pub const CREDENTIAL_FIELD: &str = "apiToken";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Boxed, sendable future returned by every handler stage.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Failure escaping a stage together with the call's error context.
#[derive(Debug, Clone)]
pub struct ContextualError {
    /// Underlying failure.
    pub error: ActionError,
    /// Per-call error context at the time of failure.
    pub context: ErrorContext,
}

/// Output of stages below the error-handling boundary.
pub type StageResult = Result<ResponseEnvelope, ContextualError>;

/// Stage receiving validated, typed args.
pub type TypedHandler<A> =
    Arc<dyn Fn(ValidatedArgs<A>, ErrorContext) -> BoxFuture<StageResult> + Send + Sync>;

/// Stage receiving raw args and a per-call error context.
pub type InnerHandler = Arc<dyn Fn(Value, ErrorContext) -> BoxFuture<StageResult> + Send + Sync>;

/// Fully composed handler: raw args in, envelope out.
pub type ComposedHandler = Arc<dyn Fn(Value) -> BoxFuture<ResponseEnvelope> + Send + Sync>;

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

/// Wraps a typed handler with schema validation for `(domain, name)`.
///
/// Args failing the schema, missing the credential, or not decoding into `A`
/// short-circuit with a validation error envelope; the inner handler is not
/// invoked.
pub fn with_schema_validation<A>(
    registry: SharedSchemaRegistry,
    domain: &str,
    name: &str,
    handler: TypedHandler<A>,
) -> InnerHandler
where
    A: DeserializeOwned + Send + 'static,
{
    let domain = domain.to_string();
    let name = name.to_string();
    Arc::new(move |args: Value, context: ErrorContext| -> BoxFuture<StageResult> {
        match validate_args::<A>(&registry, &domain, &name, &args) {
            Ok(validated) => handler(validated, context),
            Err(failure) => {
                let envelope = validation_envelope(&domain, &name, &failure);
                Box::pin(ready(Ok::<_, ContextualError>(envelope)))
            }
        }
    })
}

/// Validates raw args and splits them into common and typed parts.
fn validate_args<A: DeserializeOwned>(
    registry: &SharedSchemaRegistry,
    domain: &str,
    name: &str,
    args: &Value,
) -> Result<ValidatedArgs<A>, ValidationFailure> {
    let data = match registry.validate(domain, name, args) {
        SchemaValidation::Valid {
            data,
        } => data,
        SchemaValidation::Invalid(failure) => return Err(failure),
    };
    let decode_failure = |message: String| ValidationFailure {
        error: format!("parameters for {domain}:{name} could not be decoded"),
        issues: vec![ValidationIssue::new("", message)],
        description: registry.get_description(domain, name).map(str::to_string),
    };
    let common: CommonArgs =
        serde_json::from_value(data.clone()).map_err(|err| decode_failure(err.to_string()))?;
    let token = common.api_token.as_deref().map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(ValidationFailure {
            error: format!("missing credential for {domain}:{name}"),
            issues: vec![ValidationIssue::new(CREDENTIAL_FIELD, "is required")],
            description: registry.get_description(domain, name).map(str::to_string),
        });
    }
    let credential = ApiCredential::new(token);
    let params: A =
        serde_json::from_value(data.clone()).map_err(|err| decode_failure(err.to_string()))?;
    Ok(ValidatedArgs::new(credential, common, params, data))
}

/// Builds the envelope returned for locally rejected args.
#[must_use]
pub fn validation_envelope(
    domain: &str,
    name: &str,
    failure: &ValidationFailure,
) -> ResponseEnvelope {
    ResponseEnvelope::error_with_data(
        format!("Invalid parameters for {domain}.{name}:\n{}", failure.formatted_errors()),
        json!({
            "kind": ErrorKind::Validation.as_str(),
            "issues": failure.issues,
        }),
    )
}

// ============================================================================
// SECTION: Error Handling
// ============================================================================

/// Wraps a stage so every failure becomes an error envelope.
///
/// `context` is a template cloned for each call. When the call args set
/// `debug`, the error envelope carries a trace labeled with `meta` holding the
/// failure detail and context.
pub fn with_error_handling(
    handler: InnerHandler,
    context: ErrorContext,
    meta: TraceMeta,
) -> ComposedHandler {
    let meta = Arc::new(meta);
    Arc::new(move |args: Value| -> BoxFuture<ResponseEnvelope> {
        let debug_input = debug_requested(&args).then(|| args.clone());
        let started = Instant::now();
        let started_at_ms = unix_millis();
        let pending = handler(args, context.clone());
        let meta = Arc::clone(&meta);
        Box::pin(async move {
            match pending.await {
                Ok(envelope) => envelope,
                Err(ContextualError {
                    error,
                    context,
                }) => {
                    let mut envelope = error_envelope(&error, &context);
                    if let Some(input) = debug_input {
                        let mut trace = meta.start_trace(input, started_at_ms);
                        trace.duration_ms = elapsed_ms(started);
                        trace.error = Some(debug_error(&error));
                        trace.context = Some(context);
                        envelope.set_debug(trace);
                    }
                    envelope
                }
            }
        })
    })
}

/// Converts a failure into a classified error envelope.
#[must_use]
pub fn error_envelope(error: &ActionError, context: &ErrorContext) -> ResponseEnvelope {
    let shape = error.shape();
    let kind = classify_error(&shape);
    let detail = extract_detailed_error_info(&shape);
    let body = match kind {
        ErrorKind::Authorization => {
            "Invalid API token or insufficient permissions. Check that the token is valid and \
             has access to this resource."
                .to_string()
        }
        ErrorKind::NotFound => not_found_message(context, &shape),
        ErrorKind::Validation if detail.contains("locales") => format!(
            "Validation failed for localized fields: {detail}. Localized fields must provide a \
             value for every enabled locale, using the same locale keys across all fields."
        ),
        ErrorKind::Validation => format!("Validation failed: {detail}"),
        ErrorKind::VersionConflict => format!(
            "Version conflict: the {} was modified since it was last read. Retrieve the latest \
             version and retry with its version number. ({detail})",
            context.resource_type
        ),
        ErrorKind::Generic => detail,
    };
    ResponseEnvelope::error_with_data(
        format!("Error in {}: {body}", context.handler_name),
        json!({"kind": kind.as_str()}),
    )
}

/// Renders the not-found template from the context, falling back to the shape.
fn not_found_message(context: &ErrorContext, shape: &Value) -> String {
    let resource_type = shape
        .get("resource_type")
        .and_then(Value::as_str)
        .unwrap_or(context.resource_type.as_str());
    let resource_id = context
        .resource_id
        .as_deref()
        .or_else(|| shape.get("resource_id").and_then(Value::as_str));
    match (context.resource_id_field.as_deref(), resource_id) {
        (Some(field), Some(id)) => {
            format!("{resource_type} with {field} '{id}' was not found.")
        }
        (None, Some(id)) => format!("{resource_type} '{id}' was not found."),
        (_, None) => format!("{resource_type} was not found."),
    }
}

/// Captures the failure detail recorded in debug traces.
fn debug_error(error: &ActionError) -> DebugError {
    let shape = error.shape();
    DebugError {
        kind: classify_error(&shape).as_str().to_string(),
        error_type: error.type_name().to_string(),
        message: error.to_string(),
        detail: Some(extract_detailed_error_info(&shape)),
    }
}

/// Returns elapsed milliseconds since `started`, saturating.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
