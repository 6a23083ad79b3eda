// crates/action-dispatch-core/src/lib.rs
// ============================================================================
// Module: Action Dispatch Core Library
// Description: Schema-validated action routing with normalized responses.
// Purpose: Expose the registry, middleware, handler factory, and routers.
// Dependencies: action-dispatch-config, async-trait, jsonschema, serde
// ============================================================================

//! ## Overview
//! `action-dispatch-core` accepts `{action, args}` requests per resource
//! domain, validates `args` against a registered JSON Schema, runs the matching
//! composed handler against an external collaborator client, and returns a
//! single [`ResponseEnvelope`] shape for every outcome. Failures are classified
//! by their status code and error-kind tags into a closed [`ErrorKind`] set.
//!
//! Startup populates a [`SchemaRegistry`], freezes it through
//! [`DispatchRuntime::from_config`], then builds one [`HandlerFactory`] and one
//! [`ActionRouter`] per domain.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod classify;
pub mod context;
pub mod debug;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod introspect;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::DispatchAuditEvent;
pub use audit::DispatchAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ShortCircuit;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use classify::ErrorKind;
pub use classify::classify_error;
pub use classify::extract_detailed_error_info;
pub use classify::is_authorization_error;
pub use classify::is_not_found_error;
pub use classify::is_validation_error;
pub use classify::is_version_conflict_error;
pub use context::ApiCredential;
pub use context::ErrorContext;
pub use context::OperationContext;
pub use context::OperationKind;
pub use context::ValidatedArgs;
pub use debug::DebugSwitch;
pub use debug::TraceMeta;
pub use debug::with_debug_tracking;
pub use envelope::DebugError;
pub use envelope::DebugTrace;
pub use envelope::ResponseEnvelope;
pub use error::ActionError;
pub use error::ApiError;
pub use factory::ActionSpec;
pub use factory::ClientFactory;
pub use factory::HandlerFactory;
pub use factory::SuccessMessage;
pub use introspect::SchemaShape;
pub use introspect::schema_info;
pub use introspect::usage_example;
pub use middleware::BoxFuture;
pub use middleware::ComposedHandler;
pub use middleware::with_error_handling;
pub use middleware::with_schema_validation;
pub use registry::RegistryError;
pub use registry::SchemaRegistry;
pub use registry::SchemaValidation;
pub use registry::SharedSchemaRegistry;
pub use registry::ValidationFailure;
pub use registry::ValidationIssue;
pub use router::ActionRequest;
pub use router::ActionRouter;
pub use router::ActionRouterBuilder;
pub use router::ActionSet;
pub use router::HintPolicy;
pub use router::RouterError;
pub use runtime::DispatchRuntime;
pub use telemetry::DispatchMetrics;
pub use telemetry::DispatchOutcome;
pub use telemetry::NoopMetrics;
