// crates/action-dispatch-core/src/debug.rs
// ============================================================================
// Module: Debug Tracking
// Description: Opt-in request lifecycle traces for composed handlers.
// Purpose: Attach timing, input, and outcome copies to debug responses.
// Dependencies: action-dispatch-config, serde_json
// ============================================================================

//! ## Overview
//! [`with_debug_tracking`] is the outermost middleware stage. A trace is
//! captured only when the process-wide [`DebugSwitch`] is on and the call args
//! carry `debug: true`; otherwise the stage forwards the call untouched. Trace
//! fields are copies: the stage never changes the args or the envelope data
//! it observes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use action_dispatch_config::DebugConfig;
use serde_json::Value;

use crate::classify::ErrorKind;
use crate::context::debug_requested;
use crate::envelope::DebugError;
use crate::envelope::DebugTrace;
use crate::envelope::ResponseEnvelope;
use crate::middleware::BoxFuture;
use crate::middleware::ComposedHandler;
use crate::middleware::elapsed_ms;

// ============================================================================
// SECTION: Switch
// ============================================================================

/// Process-wide debug switch shared by every handler built from one runtime.
#[derive(Debug, Clone, Default)]
pub struct DebugSwitch(Arc<AtomicBool>);

impl DebugSwitch {
    /// Creates a switch in the given state.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    /// Creates a switch from configuration.
    #[must_use]
    pub fn from_config(config: &DebugConfig) -> Self {
        Self::new(config.enabled)
    }

    /// Returns whether trace capture is enabled process-wide.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Turns trace capture on or off for every handler sharing this switch.
    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}

// ============================================================================
// SECTION: Trace Metadata
// ============================================================================

/// Handler identity recorded on traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMeta {
    /// Handler identity (`domain.action`).
    pub handler_name: String,
    /// Resource domain.
    pub domain: String,
    /// Action name.
    pub action: String,
}

impl TraceMeta {
    /// Creates trace metadata for `domain.action`.
    #[must_use]
    pub fn new(domain: &str, action: &str) -> Self {
        Self {
            handler_name: format!("{domain}.{action}"),
            domain: domain.to_string(),
            action: action.to_string(),
        }
    }

    /// Starts an empty trace for this handler.
    #[must_use]
    pub fn start_trace(&self, input: Value, started_at_ms: u64) -> DebugTrace {
        DebugTrace {
            handler: self.handler_name.clone(),
            domain: self.domain.clone(),
            action: self.action.clone(),
            started_at_ms,
            duration_ms: 0,
            input,
            output: None,
            error: None,
            context: None,
        }
    }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Returns a stage that records a trace around `handler` when debug is active.
pub fn with_debug_tracking(
    meta: TraceMeta,
    switch: DebugSwitch,
) -> impl FnOnce(ComposedHandler) -> ComposedHandler {
    move |handler: ComposedHandler| -> ComposedHandler {
        let meta = Arc::new(meta);
        Arc::new(move |args: Value| -> BoxFuture<ResponseEnvelope> {
            if !(switch.enabled() && debug_requested(&args)) {
                return handler(args);
            }
            let trace = meta.start_trace(args.clone(), unix_millis());
            let started = Instant::now();
            let pending = handler(args);
            Box::pin(async move {
                let mut envelope = pending.await;
                let inner = envelope.take_debug();
                let trace = finish_trace(trace, started, &envelope, inner);
                envelope.with_debug(trace)
            })
        })
    }
}

/// Completes a trace from the observed envelope and any inner trace.
fn finish_trace(
    mut trace: DebugTrace,
    started: Instant,
    envelope: &ResponseEnvelope,
    inner: Option<DebugTrace>,
) -> DebugTrace {
    trace.duration_ms = elapsed_ms(started);
    match envelope {
        ResponseEnvelope::Success {
            data,
            ..
        } => trace.output = Some(data.clone()),
        ResponseEnvelope::Error {
            message,
            data,
            ..
        } => {
            let (error, context) = match inner {
                Some(inner) => (inner.error, inner.context),
                None => (None, None),
            };
            trace.error = error.or_else(|| {
                let kind = data
                    .as_ref()
                    .and_then(|data| data.get("kind"))
                    .and_then(Value::as_str)
                    .unwrap_or(ErrorKind::Generic.as_str());
                Some(DebugError {
                    kind: kind.to_string(),
                    error_type: "ErrorEnvelope".to_string(),
                    message: message.clone(),
                    detail: None,
                })
            });
            trace.context = context;
        }
    }
    trace
}

/// Returns the current unix epoch in milliseconds.
pub(crate) fn unix_millis() -> u64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(now.as_millis()).unwrap_or(u64::MAX)
}
