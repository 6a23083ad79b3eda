// crates/action-dispatch-core/src/audit.rs
// ============================================================================
// Module: Dispatch Audit Logging
// Description: Structured audit events for routed action requests.
// Purpose: Emit one JSON line per request without leaking call arguments.
// Dependencies: action-dispatch-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Every routed request produces one [`DispatchAuditEvent`]. Events carry the
//! domain, action, outcome and error kind, never the args (which hold the
//! caller's credential). Sinks write JSON lines to stderr or an append-only
//! file, or drop events entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use action_dispatch_config::AuditConfig;
use action_dispatch_config::AuditSinkKind;
use serde::Serialize;

use crate::telemetry::DispatchOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Router stage that answered without invoking a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortCircuit {
    /// Action name not in the domain's action set.
    UnknownAction,
    /// Args looked incomplete; documentation hint returned.
    ParameterHint,
    /// Args failed the registered schema.
    InvalidParameters,
}

/// Dispatch audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Resource domain.
    pub domain: String,
    /// Requested action label.
    pub action: String,
    /// Request outcome.
    pub outcome: DispatchOutcome,
    /// Error kind label for error envelopes.
    pub error_kind: Option<String>,
    /// Router short-circuit stage, if any.
    pub short_circuit: Option<ShortCircuit>,
    /// Elapsed dispatch time in milliseconds.
    pub duration_ms: u64,
}

/// Inputs for constructing a dispatch audit event.
#[derive(Debug, Clone)]
pub struct DispatchAuditEventParams {
    /// Resource domain.
    pub domain: String,
    /// Requested action label.
    pub action: String,
    /// Request outcome.
    pub outcome: DispatchOutcome,
    /// Error kind label for error envelopes.
    pub error_kind: Option<String>,
    /// Router short-circuit stage, if any.
    pub short_circuit: Option<ShortCircuit>,
    /// Elapsed dispatch time in milliseconds.
    pub duration_ms: u64,
}

impl DispatchAuditEvent {
    /// Creates a new audit event stamped with the current time.
    #[must_use]
    pub fn new(params: DispatchAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "action_dispatch",
            timestamp_ms,
            domain: params.domain,
            action: params.action,
            outcome: params.outcome,
            error_kind: params.error_kind,
            short_circuit: params.short_circuit,
            duration_ms: params.duration_ms,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for dispatch events.
pub trait DispatchAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &DispatchAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl DispatchAuditSink for StderrAuditSink {
    fn record(&self, event: &DispatchAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DispatchAuditSink for FileAuditSink {
    fn record(&self, event: &DispatchAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that drops events.
pub struct NoopAuditSink;

impl DispatchAuditSink for NoopAuditSink {
    fn record(&self, _event: &DispatchAuditEvent) {}
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its path.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn DispatchAuditSink>> {
    match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::File, Some(path)) => Ok(Arc::new(FileAuditSink::new(Path::new(path))?)),
        (AuditSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "audit file sink requires a path"))
        }
    }
}
