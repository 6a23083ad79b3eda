// crates/action-dispatch-core/src/runtime.rs
// ============================================================================
// Module: Dispatch Runtime
// Description: Startup boundary wiring configuration into routers.
// Purpose: Freeze the registry once and hand out domain factories and routers.
// Dependencies: action-dispatch-config
// ============================================================================

//! ## Overview
//! [`DispatchRuntime::from_config`] is the init boundary: it takes ownership
//! of a fully populated [`SchemaRegistry`], freezes it, and builds the shared
//! debug switch, hint policy and audit sink. Everything created afterwards
//! reads the frozen registry, so registration cannot race with dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use action_dispatch_config::ConfigError;
use action_dispatch_config::DispatchConfig;

use crate::audit::DispatchAuditSink;
use crate::audit::audit_sink_from_config;
use crate::debug::DebugSwitch;
use crate::factory::ClientFactory;
use crate::factory::HandlerFactory;
use crate::registry::SchemaRegistry;
use crate::registry::SharedSchemaRegistry;
use crate::router::ActionRouterBuilder;
use crate::router::ActionSet;
use crate::router::HintPolicy;
use crate::telemetry::DispatchMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Shared dispatch state for every domain in the process.
#[derive(Clone)]
pub struct DispatchRuntime {
    /// Frozen schema registry.
    registry: SharedSchemaRegistry,
    /// Process-wide debug switch.
    debug: DebugSwitch,
    /// Hint policy applied by every router.
    hints: HintPolicy,
    /// Audit sink shared by every router.
    audit: Arc<dyn DispatchAuditSink>,
    /// Metrics sink shared by every router.
    metrics: Arc<dyn DispatchMetrics>,
}

impl DispatchRuntime {
    /// Freezes `registry` and applies `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid or the audit
    /// sink cannot be opened.
    pub fn from_config(
        config: &DispatchConfig,
        registry: SchemaRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let audit = audit_sink_from_config(&config.audit)
            .map_err(|err| ConfigError::Io(format!("audit sink: {err}")))?;
        Ok(Self {
            registry: registry.freeze(),
            debug: DebugSwitch::from_config(&config.debug),
            hints: HintPolicy::from_config(&config.hints),
            audit,
            metrics: Arc::new(NoopMetrics),
        })
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the frozen registry.
    #[must_use]
    pub fn registry(&self) -> &SharedSchemaRegistry {
        &self.registry
    }

    /// Returns the process-wide debug switch.
    #[must_use]
    pub fn debug_switch(&self) -> &DebugSwitch {
        &self.debug
    }

    /// Creates a handler factory for `domain`.
    #[must_use]
    pub fn handler_factory<F: ClientFactory>(
        &self,
        domain: &str,
        clients: Arc<F>,
    ) -> HandlerFactory<F> {
        HandlerFactory::new(domain, Arc::clone(&self.registry), clients, self.debug.clone())
    }

    /// Starts a router for `domain` with the runtime's policy and sinks.
    #[must_use]
    pub fn router<A: ActionSet>(&self, domain: &str) -> ActionRouterBuilder<A> {
        ActionRouterBuilder::new(domain, Arc::clone(&self.registry))
            .hints(self.hints.clone())
            .audit(Arc::clone(&self.audit))
            .metrics(Arc::clone(&self.metrics))
            .debug(self.debug.clone())
    }
}
