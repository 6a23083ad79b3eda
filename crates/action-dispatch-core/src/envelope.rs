// crates/action-dispatch-core/src/envelope.rs
// ============================================================================
// Module: Response Envelope
// Description: Canonical success/error wire shape and debug trace payload.
// Purpose: Normalize every handler outcome into one response shape.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`ResponseEnvelope`] is the only value a composed handler or router ever
//! returns. It serializes as `{"status": "success", ...}` or
//! `{"status": "error", ...}`. The optional `debug` field holds a
//! [`DebugTrace`] and is only populated when the caller asked for it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::context::ErrorContext;
use crate::error::ActionError;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Normalized response envelope.
///
/// # Invariants
/// - Exactly one of the two status values is present on the wire.
/// - `debug` is `Some` only when a debug flag was set by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// Successful outcome.
    Success {
        /// Result payload.
        data: Value,
        /// Optional human-readable summary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Optional debug trace.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug: Option<Box<DebugTrace>>,
    },
    /// Failed outcome.
    Error {
        /// Human-readable failure description.
        message: String,
        /// Optional structured failure payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        /// Optional debug trace.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug: Option<Box<DebugTrace>>,
    },
}

impl ResponseEnvelope {
    /// Builds a success envelope without a message.
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self::Success {
            data,
            message: None,
            debug: None,
        }
    }

    /// Builds a success envelope with a summary message.
    #[must_use]
    pub fn success_with_message(data: Value, message: impl Into<String>) -> Self {
        Self::Success {
            data,
            message: Some(message.into()),
            debug: None,
        }
    }

    /// Builds an error envelope without data.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            data: None,
            debug: None,
        }
    }

    /// Builds an error envelope carrying structured data.
    #[must_use]
    pub fn error_with_data(message: impl Into<String>, data: Value) -> Self {
        Self::Error {
            message: message.into(),
            data: Some(data),
            debug: None,
        }
    }

    /// Serializes an operation result into a success envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Serialization`] when the result cannot be
    /// represented as JSON.
    pub fn from_result<R: Serialize>(
        result: &R,
        message: Option<String>,
    ) -> Result<Self, ActionError> {
        let data = serde_json::to_value(result)?;
        Ok(Self::Success {
            data,
            message,
            debug: None,
        })
    }

    /// Returns true for success envelopes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the envelope message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success {
                message,
                ..
            } => message.as_deref(),
            Self::Error {
                message,
                ..
            } => Some(message.as_str()),
        }
    }

    /// Returns the envelope data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Success {
                data,
                ..
            } => Some(data),
            Self::Error {
                data,
                ..
            } => data.as_ref(),
        }
    }

    /// Returns the attached debug trace, if any.
    #[must_use]
    pub fn debug(&self) -> Option<&DebugTrace> {
        match self {
            Self::Success {
                debug,
                ..
            }
            | Self::Error {
                debug,
                ..
            } => debug.as_deref(),
        }
    }

    /// Removes and returns the attached debug trace.
    pub fn take_debug(&mut self) -> Option<DebugTrace> {
        match self {
            Self::Success {
                debug,
                ..
            }
            | Self::Error {
                debug,
                ..
            } => debug.take().map(|trace| *trace),
        }
    }

    /// Attaches a debug trace, replacing any existing one.
    pub fn set_debug(&mut self, trace: DebugTrace) {
        match self {
            Self::Success {
                debug,
                ..
            }
            | Self::Error {
                debug,
                ..
            } => *debug = Some(Box::new(trace)),
        }
    }

    /// Returns the envelope with a debug trace attached.
    #[must_use]
    pub fn with_debug(mut self, trace: DebugTrace) -> Self {
        self.set_debug(trace);
        self
    }

    /// Converts the envelope into its JSON wire form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// SECTION: Debug Trace
// ============================================================================

/// Structured trace of one request lifecycle.
///
/// # Invariants
/// - `input` is a copy of the call args; `output` is a copy of success data.
/// - Exactly one of `output` and `error` is set once the trace is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    /// Handler identity.
    pub handler: String,
    /// Resource domain.
    pub domain: String,
    /// Action name.
    pub action: String,
    /// Request start (milliseconds since epoch).
    pub started_at_ms: u64,
    /// Elapsed handler time in milliseconds.
    pub duration_ms: u64,
    /// Copy of the call args.
    pub input: Value,
    /// Copy of the success data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DebugError>,
    /// Error context at the time of failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

/// Failure detail captured in a debug trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugError {
    /// Classified error kind label.
    pub kind: String,
    /// Failure origin label.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Failure message.
    pub message: String,
    /// Extracted failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
