// crates/action-dispatch-core/src/factory.rs
// ============================================================================
// Module: Handler Factory
// Description: Composes middleware around declarative base operations.
// Purpose: Build router-ready handlers for CRUD, list, and custom actions.
// Dependencies: async-trait, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`HandlerFactory`] belongs to one resource domain. Each builder method
//! takes an [`ActionSpec`] plus an async operation
//! `(client, validated args, context) -> Result<R, ActionError>` and returns a
//! [`ComposedHandler`] layered as debug tracking, error handling, schema
//! validation, then the base operation.
//!
//! The base operation obtains a fresh collaborator client per call from the
//! domain's [`ClientFactory`]; connection failures are classified like any
//! other operation failure.
//!
//! ## Invariants
//! - The resource identifier is recorded on the per-call error context before
//!   the operation runs.
//! - `retrieve` turns an empty result into a not-found failure locally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::ApiCredential;
use crate::context::ErrorContext;
use crate::context::OperationContext;
use crate::context::OperationKind;
use crate::context::ValidatedArgs;
use crate::debug::DebugSwitch;
use crate::debug::TraceMeta;
use crate::debug::with_debug_tracking;
use crate::envelope::ResponseEnvelope;
use crate::error::ActionError;
use crate::middleware::BoxFuture;
use crate::middleware::ComposedHandler;
use crate::middleware::ContextualError;
use crate::middleware::StageResult;
use crate::middleware::TypedHandler;
use crate::middleware::with_error_handling;
use crate::middleware::with_schema_validation;
use crate::registry::SharedSchemaRegistry;

// ============================================================================
// SECTION: Collaborator Clients
// ============================================================================

/// Builds collaborator clients from caller-supplied credentials.
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    /// Collaborator client handle passed to base operations.
    type Client: Send + 'static;

    /// Connects a client for one request.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the client cannot be constructed.
    async fn connect(
        &self,
        credential: &ApiCredential,
        environment: Option<&str>,
    ) -> Result<Self::Client, ActionError>;
}

// ============================================================================
// SECTION: Action Specs
// ============================================================================

/// Success message attached to a handler's envelope.
#[derive(Clone)]
pub enum SuccessMessage {
    /// Fixed text.
    Static(String),
    /// Text derived from the serialized result.
    Dynamic(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

impl SuccessMessage {
    /// Renders the message for a serialized result.
    #[must_use]
    pub fn render(&self, data: &Value) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Dynamic(render) => render(data),
        }
    }
}

impl fmt::Debug for SuccessMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Declarative description of one action's base handler.
#[derive(Debug, Clone)]
pub struct ActionSpec {
    /// Action name (also the schema name).
    pub action: String,
    /// Resource type label used in messages.
    pub resource_type: String,
    /// Argument field holding the target identifier.
    pub id_field: Option<String>,
    /// Success message override.
    pub success_message: Option<SuccessMessage>,
}

impl ActionSpec {
    /// Describes `action` operating on `resource_type`.
    #[must_use]
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource_type: resource_type.into(),
            id_field: None,
            success_message: None,
        }
    }

    /// Names the argument field holding the target identifier.
    #[must_use]
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// Overrides the success message with fixed text.
    #[must_use]
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.success_message = Some(SuccessMessage::Static(text.into()));
        self
    }

    /// Overrides the success message with a function of the result.
    #[must_use]
    pub fn message_with<M>(mut self, render: M) -> Self
    where
        M: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.success_message = Some(SuccessMessage::Dynamic(Arc::new(render)));
        self
    }

    /// Renders the override, or the fallback when none is set.
    fn render_message(&self, data: &Value, fallback: impl FnOnce() -> String) -> String {
        self.success_message.as_ref().map_or_else(fallback, |message| message.render(data))
    }
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Builds composed handlers for one resource domain.
pub struct HandlerFactory<F: ClientFactory> {
    /// Resource domain.
    domain: String,
    /// Frozen schema registry.
    registry: SharedSchemaRegistry,
    /// Collaborator client factory.
    clients: Arc<F>,
    /// Process-wide debug switch.
    debug: DebugSwitch,
}

impl<F: ClientFactory> Clone for HandlerFactory<F> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            registry: Arc::clone(&self.registry),
            clients: Arc::clone(&self.clients),
            debug: self.debug.clone(),
        }
    }
}

impl<F: ClientFactory> HandlerFactory<F> {
    /// Creates a factory for `domain`.
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        registry: SharedSchemaRegistry,
        clients: Arc<F>,
        debug: DebugSwitch,
    ) -> Self {
        Self {
            domain: domain.into(),
            registry,
            clients,
            debug,
        }
    }

    /// Returns the factory's domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Builds a create handler; default message is `"{type} created successfully."`.
    pub fn create<A, R, Op, Fut>(&self, spec: ActionSpec, op: Op) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
    {
        let meta = spec.clone();
        self.compose(&spec, OperationKind::Create, op, move |result: R, _ctx: &OperationContext| {
            let data = serde_json::to_value(&result)?;
            let message = meta
                .render_message(&data, || format!("{} created successfully.", meta.resource_type));
            Ok(ResponseEnvelope::success_with_message(data, message))
        })
    }

    /// Builds a retrieve handler; `None` or JSON `null` results become not-found failures.
    pub fn retrieve<A, R, Op, Fut>(&self, spec: ActionSpec, op: Op) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<R>, ActionError>> + Send + 'static,
    {
        let meta = spec.clone();
        self.compose(
            &spec,
            OperationKind::Retrieve,
            op,
            move |result: Option<R>, ctx: &OperationContext| {
                let not_found =
                    || ActionError::not_found(meta.resource_type.clone(), ctx.resource_id.clone());
                let Some(result) = result else {
                    return Err(not_found());
                };
                let data = serde_json::to_value(&result)?;
                if data.is_null() {
                    return Err(not_found());
                }
                let message = meta.success_message.as_ref().map(|message| message.render(&data));
                Ok(ResponseEnvelope::Success {
                    data,
                    message,
                    debug: None,
                })
            },
        )
    }

    /// Builds an update handler; default message is `"{type} {id} was successfully updated."`.
    pub fn update<A, R, Op, Fut>(&self, spec: ActionSpec, op: Op) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
    {
        let meta = spec.clone();
        self.compose(&spec, OperationKind::Update, op, move |result: R, ctx: &OperationContext| {
            let data = serde_json::to_value(&result)?;
            let message = meta.render_message(&data, || {
                entity_message(&meta.resource_type, ctx.resource_id.as_deref(), "updated")
            });
            Ok(ResponseEnvelope::success_with_message(data, message))
        })
    }

    /// Builds a delete handler; the operation's result is discarded.
    pub fn delete<A, R, Op, Fut>(&self, spec: ActionSpec, op: Op) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        R: Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
    {
        let meta = spec.clone();
        self.compose(&spec, OperationKind::Delete, op, move |_result: R, ctx: &OperationContext| {
            let message = meta.render_message(&Value::Null, || {
                entity_message(&meta.resource_type, ctx.resource_id.as_deref(), "deleted")
            });
            Ok(ResponseEnvelope::success_with_message(Value::Null, message))
        })
    }

    /// Builds a list handler; default message is `"Found {n} {type}(s)"`.
    pub fn list<A, R, Op, Fut>(&self, spec: ActionSpec, op: Op) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<R>, ActionError>> + Send + 'static,
    {
        let meta = spec.clone();
        self.compose(&spec, OperationKind::List, op, move |items: Vec<R>, _ctx: &OperationContext| {
            let count = items.len();
            let data = serde_json::to_value(&items)?;
            let message =
                meta.render_message(&data, || format!("Found {count} {}(s)", meta.resource_type));
            Ok(ResponseEnvelope::success_with_message(data, message))
        })
    }

    /// Builds a handler whose body produces the envelope itself.
    pub fn custom<A, Op, Fut>(&self, spec: ActionSpec, op: Op) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseEnvelope, ActionError>> + Send + 'static,
    {
        self.compose(
            &spec,
            OperationKind::Custom,
            op,
            |envelope: ResponseEnvelope, _ctx: &OperationContext| Ok(envelope),
        )
    }

    /// Layers the middleware stack around a base operation.
    fn compose<A, R, Op, Fut, Finish>(
        &self,
        spec: &ActionSpec,
        operation: OperationKind,
        op: Op,
        finish: Finish,
    ) -> ComposedHandler
    where
        A: DeserializeOwned + Send + 'static,
        R: Send + 'static,
        Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        Finish: Fn(R, &OperationContext) -> Result<ResponseEnvelope, ActionError>
            + Send
            + Sync
            + 'static,
    {
        let clients = Arc::clone(&self.clients);
        let op = Arc::new(op);
        let finish = Arc::new(finish);
        let domain = self.domain.clone();
        let action = spec.action.clone();
        let id_field = spec.id_field.clone();
        let base: TypedHandler<A> = Arc::new(
            move |args: ValidatedArgs<A>, mut context: ErrorContext| -> BoxFuture<StageResult> {
                if let Some(id) = id_field.as_deref().and_then(|field| args.field_str(field)) {
                    context.record_resource_id(id);
                }
                let op_context = OperationContext {
                    domain: domain.clone(),
                    action: action.clone(),
                    handler_name: context.handler_name.clone(),
                    resource_id: context.resource_id.clone(),
                };
                let clients = Arc::clone(&clients);
                let op = Arc::clone(&op);
                let finish = Arc::clone(&finish);
                Box::pin(async move {
                    run_operation(clients.as_ref(), op.as_ref(), finish.as_ref(), args, op_context)
                        .await
                        .map_err(|error| ContextualError {
                            error,
                            context,
                        })
                })
            },
        );

        let mut template = ErrorContext::new(
            format!("{}.{}", self.domain, spec.action),
            operation,
            spec.resource_type.clone(),
        );
        if let Some(field) = &spec.id_field {
            template = template.with_resource_id_field(field.clone());
        }
        let validated =
            with_schema_validation(Arc::clone(&self.registry), &self.domain, &spec.action, base);
        let meta = TraceMeta::new(&self.domain, &spec.action);
        let guarded = with_error_handling(validated, template, meta.clone());
        with_debug_tracking(meta, self.debug.clone())(guarded)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Connects a client, runs the operation, and shapes its result.
async fn run_operation<F, A, R, Op, Fut, Finish>(
    clients: &F,
    op: &Op,
    finish: &Finish,
    args: ValidatedArgs<A>,
    context: OperationContext,
) -> Result<ResponseEnvelope, ActionError>
where
    F: ClientFactory,
    Op: Fn(F::Client, ValidatedArgs<A>, OperationContext) -> Fut,
    Fut: Future<Output = Result<R, ActionError>>,
    Finish: Fn(R, &OperationContext) -> Result<ResponseEnvelope, ActionError>,
{
    let client = clients.connect(&args.credential, args.environment.as_deref()).await?;
    let result = op(client, args, context.clone()).await?;
    finish(result, &context)
}

/// Renders `"{type} {id} was successfully {verb}."`.
fn entity_message(resource_type: &str, resource_id: Option<&str>, verb: &str) -> String {
    match resource_id {
        Some(id) => format!("{resource_type} {id} was successfully {verb}."),
        None => format!("{resource_type} was successfully {verb}."),
    }
}

#[cfg(test)]
mod tests;
