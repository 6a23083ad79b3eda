// crates/action-dispatch-core/src/telemetry.rs
// ============================================================================
// Module: Dispatch Telemetry
// Description: Observability hooks for routed action requests.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A thin metrics interface for per-domain request counters and latency
//! histograms. Deployments plug in their own exporter by implementing
//! [`DispatchMetrics`]. Labels never include call arguments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for dispatch histograms.
pub const DISPATCH_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Routed request outcome.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Success envelope returned.
    Ok,
    /// Error envelope returned.
    Error,
}

impl DispatchOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Routed request metric event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMetricEvent {
    /// Resource domain.
    pub domain: String,
    /// Requested action label (may be unknown to the domain).
    pub action: String,
    /// Request outcome.
    pub outcome: DispatchOutcome,
    /// Error kind label for error envelopes.
    pub error_kind: Option<String>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for routed requests and latencies.
pub trait DispatchMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: DispatchMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: DispatchMetricEvent, latency: Duration);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl DispatchMetrics for NoopMetrics {
    fn record_request(&self, _event: DispatchMetricEvent) {}

    fn record_latency(&self, _event: DispatchMetricEvent, _latency: Duration) {}
}
