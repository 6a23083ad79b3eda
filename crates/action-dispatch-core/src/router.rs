// crates/action-dispatch-core/src/router.rs
// ============================================================================
// Module: Action Router
// Description: Per-domain dispatch of `{action, args}` requests.
// Purpose: Route untyped requests to composed handlers with uniform replies.
// Dependencies: action-dispatch-config, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`ActionRouter`] owns one resource domain's closed [`ActionSet`] and a
//! composed handler per action. Dispatch runs these stages in order:
//!
//! 1. Unknown action names return an error envelope listing valid actions.
//! 2. Empty (or, for non-trivial actions, thin) args return a hint to fetch
//!    the action's parameter documentation first.
//! 3. Args failing the registered schema return every failed field plus the
//!    schema shape.
//! 4. Otherwise the composed handler's envelope is returned unchanged.
//!
//! The router holds no per-call state. Every dispatch emits one audit event
//! and one metric observation.
//!
//! ## Invariants
//! - A router is only constructed when every action in its set has both a
//!   handler and a registered schema.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use action_dispatch_config::HintConfig;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::audit::DispatchAuditEvent;
use crate::audit::DispatchAuditEventParams;
use crate::audit::DispatchAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::ShortCircuit;
use crate::classify::ErrorKind;
use crate::context::debug_requested;
use crate::debug::DebugSwitch;
use crate::debug::TraceMeta;
use crate::debug::unix_millis;
use crate::envelope::DebugError;
use crate::envelope::DebugTrace;
use crate::envelope::ResponseEnvelope;
use crate::introspect::schema_info;
use crate::middleware::ComposedHandler;
use crate::middleware::elapsed_ms;
use crate::middleware::validation_envelope;
use crate::registry::SchemaValidation;
use crate::registry::SharedSchemaRegistry;
use crate::registry::ValidationFailure;
use crate::telemetry::DispatchMetricEvent;
use crate::telemetry::DispatchMetrics;
use crate::telemetry::DispatchOutcome;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Envelope `data.kind` for unknown actions.
const UNKNOWN_ACTION_KIND: &str = "unknown_action";
/// Envelope `data.kind` for the documentation hint.
const PARAMETERS_REQUIRED_KIND: &str = "parameters_required";

// ============================================================================
// SECTION: Action Sets
// ============================================================================

/// Closed set of actions served by one domain.
pub trait ActionSet: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every action in the set.
    fn all() -> &'static [Self];

    /// Wire name of the action.
    fn as_str(self) -> &'static str;

    /// Parses a wire name into an action.
    fn parse(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|action| action.as_str() == label)
    }
}

/// Untyped inbound request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionRequest {
    /// Requested action name.
    pub action: String,
    /// Untyped call args.
    #[serde(default = "empty_args")]
    pub args: Value,
}

impl ActionRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(action: impl Into<String>, args: Value) -> Self {
        Self {
            action: action.into(),
            args,
        }
    }
}

/// Default args for requests that omit them.
fn empty_args() -> Value {
    Value::Object(Map::new())
}

// ============================================================================
// SECTION: Hint Policy
// ============================================================================

/// Heuristic deciding when to nudge callers toward parameter documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintPolicy {
    /// Whether hints are emitted at all.
    pub enabled: bool,
    /// Key count below which non-trivial actions trigger a hint.
    pub min_arg_count: usize,
    /// Actions held to the key-count threshold.
    pub non_trivial_actions: BTreeSet<String>,
    /// Documentation action named in the hint.
    pub docs_action: String,
}

impl HintPolicy {
    /// Builds a policy from configuration.
    #[must_use]
    pub fn from_config(config: &HintConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_arg_count: config.min_arg_count,
            non_trivial_actions: config.non_trivial_actions.iter().cloned().collect(),
            docs_action: config.docs_action.clone(),
        }
    }

    /// Policy that never emits hints.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns true when `args` look too thin for `action`.
    ///
    /// The `debug` flag does not count as an argument.
    #[must_use]
    pub fn should_hint(&self, action: &str, args: &Value) -> bool {
        if !self.enabled {
            return false;
        }
        let count = match args {
            Value::Object(map) => map.keys().filter(|key| key.as_str() != "debug").count(),
            Value::Null => 0,
            _ => return false,
        };
        count == 0 || (self.non_trivial_actions.contains(action) && count < self.min_arg_count)
    }
}

impl Default for HintPolicy {
    fn default() -> Self {
        Self::from_config(&HintConfig::default())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Router construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// An action in the set has no handler.
    #[error("no handler routed for {domain}.{action}")]
    MissingHandler {
        /// Resource domain.
        domain: String,
        /// Action name.
        action: String,
    },
    /// An action in the set has no registered schema.
    #[error("no schema registered for {domain}:{action}")]
    MissingSchema {
        /// Resource domain.
        domain: String,
        /// Action name.
        action: String,
    },
}

impl RouterError {
    /// Returns the stable error code for this router error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingHandler {
                ..
            } => "handler_missing",
            Self::MissingSchema {
                ..
            } => "schema_missing",
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for an [`ActionRouter`].
pub struct ActionRouterBuilder<A: ActionSet> {
    /// Resource domain.
    domain: String,
    /// Frozen schema registry.
    registry: SharedSchemaRegistry,
    /// Handlers routed so far.
    handlers: HashMap<&'static str, ComposedHandler>,
    /// Hint policy.
    hints: HintPolicy,
    /// Audit sink.
    audit: Arc<dyn DispatchAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn DispatchMetrics>,
    /// Process-wide debug switch.
    debug: DebugSwitch,
    /// Action set marker.
    actions: PhantomData<A>,
}

impl<A: ActionSet> ActionRouterBuilder<A> {
    /// Starts a router for `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>, registry: SharedSchemaRegistry) -> Self {
        Self {
            domain: domain.into(),
            registry,
            handlers: HashMap::new(),
            hints: HintPolicy::default(),
            audit: Arc::new(NoopAuditSink),
            metrics: Arc::new(NoopMetrics),
            debug: DebugSwitch::default(),
            actions: PhantomData,
        }
    }

    /// Routes `action` to `handler`, replacing any earlier route.
    #[must_use]
    pub fn route(mut self, action: A, handler: ComposedHandler) -> Self {
        self.handlers.insert(action.as_str(), handler);
        self
    }

    /// Sets the hint policy.
    #[must_use]
    pub fn hints(mut self, hints: HintPolicy) -> Self {
        self.hints = hints;
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn DispatchAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the metrics sink.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets the debug switch consulted for short-circuit traces.
    #[must_use]
    pub fn debug(mut self, debug: DebugSwitch) -> Self {
        self.debug = debug;
        self
    }

    /// Builds the router.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when an action lacks a handler or schema.
    pub fn build(mut self) -> Result<ActionRouter<A>, RouterError> {
        let mut handlers = HashMap::with_capacity(A::all().len());
        for action in A::all() {
            let name = action.as_str();
            let handler =
                self.handlers.remove(name).ok_or_else(|| RouterError::MissingHandler {
                    domain: self.domain.clone(),
                    action: name.to_string(),
                })?;
            if !self.registry.has(&self.domain, name) {
                return Err(RouterError::MissingSchema {
                    domain: self.domain.clone(),
                    action: name.to_string(),
                });
            }
            handlers.insert(*action, handler);
        }
        Ok(ActionRouter {
            domain: self.domain,
            registry: self.registry,
            handlers,
            hints: self.hints,
            audit: self.audit,
            metrics: self.metrics,
            debug: self.debug,
        })
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Per-domain action router.
pub struct ActionRouter<A: ActionSet> {
    /// Resource domain.
    domain: String,
    /// Frozen schema registry.
    registry: SharedSchemaRegistry,
    /// Composed handler per action.
    handlers: HashMap<A, ComposedHandler>,
    /// Hint policy.
    hints: HintPolicy,
    /// Audit sink.
    audit: Arc<dyn DispatchAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn DispatchMetrics>,
    /// Process-wide debug switch.
    debug: DebugSwitch,
}

/// Outcome of the router's pre-dispatch checks.
enum Stage<A> {
    /// Answered without a handler.
    ShortCircuit(ShortCircuit, ResponseEnvelope),
    /// Ready to invoke the handler for this action.
    Dispatch(A),
}

impl<A: ActionSet> ActionRouter<A> {
    /// Returns the router's domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the wire names of every action, in declaration order.
    #[must_use]
    pub fn actions(&self) -> Vec<&'static str> {
        A::all().iter().map(|action| action.as_str()).collect()
    }

    /// Returns the documentation envelope for `action`.
    #[must_use]
    pub fn describe(&self, action: &str) -> ResponseEnvelope {
        schema_info(&self.registry, &self.domain, action)
    }

    /// Dispatches a raw `{action, args}` value.
    pub async fn dispatch_value(&self, request: Value) -> ResponseEnvelope {
        match serde_json::from_value::<ActionRequest>(request) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => ResponseEnvelope::error_with_data(
                format!("Invalid request for {}: {err}", self.domain),
                json!({"kind": "invalid_request", "valid_actions": self.actions()}),
            ),
        }
    }

    /// Dispatches one request and returns its envelope.
    pub async fn dispatch(&self, request: ActionRequest) -> ResponseEnvelope {
        let started = Instant::now();
        let ActionRequest {
            action,
            args,
        } = request;
        let (short_circuit, envelope) = match self.precheck(&action, &args, started) {
            Stage::ShortCircuit(stage, envelope) => (Some(stage), envelope),
            Stage::Dispatch(selected) => match self.handlers.get(&selected) {
                Some(handler) => (None, handler(args).await),
                None => (Some(ShortCircuit::UnknownAction), self.unknown_action(&action)),
            },
        };
        self.observe(&action, short_circuit, &envelope, started);
        envelope
    }

    /// Runs the unknown-action, hint, and schema checks.
    fn precheck(&self, action: &str, args: &Value, started: Instant) -> Stage<A> {
        let Some(selected) = A::parse(action) else {
            return Stage::ShortCircuit(ShortCircuit::UnknownAction, self.unknown_action(action));
        };
        if self.hints.should_hint(action, args) {
            return Stage::ShortCircuit(ShortCircuit::ParameterHint, self.hint(action));
        }
        match self.registry.validate(&self.domain, action, args) {
            SchemaValidation::Valid {
                ..
            } => Stage::Dispatch(selected),
            SchemaValidation::Invalid(failure) => {
                let mut envelope = validation_envelope(&self.domain, action, &failure);
                if let ResponseEnvelope::Error {
                    data: Some(Value::Object(data)),
                    ..
                } = &mut envelope
                    && let Some(shape) = self.registry.describe(&self.domain, action)
                {
                    data.insert("schema".to_string(), json!(shape));
                }
                if self.debug.enabled() && debug_requested(args) {
                    envelope.set_debug(self.validation_trace(action, args, &failure, started));
                }
                Stage::ShortCircuit(ShortCircuit::InvalidParameters, envelope)
            }
        }
    }

    /// Traces a call rejected by the router's schema check.
    fn validation_trace(
        &self,
        action: &str,
        args: &Value,
        failure: &ValidationFailure,
        started: Instant,
    ) -> DebugTrace {
        let duration_ms = elapsed_ms(started);
        let started_at_ms = unix_millis().saturating_sub(duration_ms);
        let meta = TraceMeta::new(&self.domain, action);
        let mut trace = meta.start_trace(args.clone(), started_at_ms);
        trace.duration_ms = duration_ms;
        trace.error = Some(DebugError {
            kind: ErrorKind::Validation.as_str().to_string(),
            error_type: "ValidationFailure".to_string(),
            message: failure.error.clone(),
            detail: Some(failure.formatted_errors()),
        });
        trace
    }

    /// Builds the unknown-action envelope.
    fn unknown_action(&self, action: &str) -> ResponseEnvelope {
        let valid = self.actions();
        ResponseEnvelope::error_with_data(
            format!(
                "Invalid action '{action}' for {}. Unsupported action. Valid actions: {}",
                self.domain,
                valid.join(", ")
            ),
            json!({"kind": UNKNOWN_ACTION_KIND, "valid_actions": valid}),
        )
    }

    /// Builds the documentation hint envelope.
    fn hint(&self, action: &str) -> ResponseEnvelope {
        let docs = &self.hints.docs_action;
        ResponseEnvelope::error_with_data(
            format!(
                "Parameters required for {domain}.{action}. Call {docs} with domain '{domain}' \
                 and action '{action}' to see the expected parameters before retrying.",
                domain = self.domain
            ),
            json!({
                "kind": PARAMETERS_REQUIRED_KIND,
                "docs": {"action": docs, "args": {"domain": self.domain, "action": action}},
            }),
        )
    }

    /// Emits the audit event and metrics for one dispatch.
    fn observe(
        &self,
        action: &str,
        short_circuit: Option<ShortCircuit>,
        envelope: &ResponseEnvelope,
        started: Instant,
    ) {
        let latency = started.elapsed();
        let (outcome, error_kind) = if envelope.is_success() {
            (DispatchOutcome::Ok, None)
        } else {
            let kind = envelope
                .data()
                .and_then(|data| data.get("kind"))
                .and_then(Value::as_str)
                .unwrap_or("generic");
            (DispatchOutcome::Error, Some(kind.to_string()))
        };
        self.audit.record(&DispatchAuditEvent::new(DispatchAuditEventParams {
            domain: self.domain.clone(),
            action: action.to_string(),
            outcome,
            error_kind: error_kind.clone(),
            short_circuit,
            duration_ms: elapsed_ms(started),
        }));
        let event = DispatchMetricEvent {
            domain: self.domain.clone(),
            action: action.to_string(),
            outcome,
            error_kind,
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, latency);
    }
}

#[cfg(test)]
mod tests;
