// crates/action-dispatch-core/tests/common/mod.rs
// =============================================================================
// Module: Dispatch Test Fixtures
// Description: Shared "records" domain fixture for dispatch integration tests.
// Purpose: Provide schemas, a spy content API, and a fully wired router.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use action_dispatch_config::DispatchConfig;
use action_dispatch_core::ActionError;
use action_dispatch_core::ActionRouter;
use action_dispatch_core::ActionSet;
use action_dispatch_core::ActionSpec;
use action_dispatch_core::ApiCredential;
use action_dispatch_core::ClientFactory;
use action_dispatch_core::DispatchRuntime;
use action_dispatch_core::HandlerFactory;
use action_dispatch_core::OperationContext;
use action_dispatch_core::ResponseEnvelope;
use action_dispatch_core::SchemaRegistry;
use action_dispatch_core::ValidatedArgs;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

/// Domain name used by every fixture.
pub const DOMAIN: &str = "records";

/// Record id whose lookups are delayed to interleave concurrent calls.
pub const SLOW_RECORD_ID: &str = "slow";

// ============================================================================
// SECTION: Action Set
// ============================================================================

/// Actions served by the records domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordAction {
    Get,
    Create,
    Update,
    Delete,
    List,
    Publish,
}

impl ActionSet for RecordAction {
    fn all() -> &'static [Self] {
        &[Self::Get, Self::Create, Self::Update, Self::Delete, Self::List, Self::Publish]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Publish => "publish",
        }
    }
}

// ============================================================================
// SECTION: Spy Content API
// ============================================================================

/// In-memory content API that counts calls and can be told to fail.
#[derive(Default)]
pub struct SpyContentApi {
    /// Number of operations executed against the API.
    pub calls: AtomicUsize,
    /// Number of clients constructed.
    pub connects: AtomicUsize,
    /// Stored records by id.
    records: Mutex<Vec<Value>>,
    /// Failure returned by every operation when set.
    failure: Mutex<Option<ActionError>>,
}

impl SpyContentApi {
    /// Creates an API pre-populated with `records`.
    pub fn with_records(records: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            ..Self::default()
        })
    }

    /// Makes every subsequent operation fail with `error`.
    pub fn fail_with(&self, error: ActionError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    /// Returns the number of operations executed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock() {
            Ok(failure) => failure.clone().map_or(Ok(()), Err),
            Err(_) => Err(ActionError::Message("spy poisoned".to_string())),
        }
    }

    fn snapshot(&self) -> Vec<Value> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }

    pub async fn find(&self, id: &str) -> Result<Option<Value>, ActionError> {
        if id == SLOW_RECORD_ID {
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        self.begin()?;
        Ok(self.snapshot().into_iter().find(|record| record["id"] == id))
    }

    pub async fn create(&self, fields: Value) -> Result<Value, ActionError> {
        self.begin()?;
        let mut record = fields;
        record["id"] = json!(format!("rec-{}", self.snapshot().len() + 1));
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(record)
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<Value>, ActionError> {
        self.begin()?;
        Ok(self.snapshot().into_iter().take(limit).collect())
    }

    pub async fn destroy(&self, id: &str) -> Result<Value, ActionError> {
        self.begin()?;
        Ok(json!({"id": id}))
    }
}

/// Client factory handing out the shared spy.
pub struct SpyClients {
    pub api: Arc<SpyContentApi>,
}

#[async_trait]
impl ClientFactory for SpyClients {
    type Client = Arc<SpyContentApi>;

    async fn connect(
        &self,
        credential: &ApiCredential,
        _environment: Option<&str>,
    ) -> Result<Self::Client, ActionError> {
        self.api.connects.fetch_add(1, Ordering::SeqCst);
        if credential.expose().is_empty() {
            return Err(ActionError::Message("empty token".to_string()));
        }
        Ok(Arc::clone(&self.api))
    }
}

// ============================================================================
// SECTION: Schemas
// ============================================================================

/// Registers the records domain schemas.
pub fn register_schemas(registry: &mut SchemaRegistry) -> Result<(), String> {
    let token = json!({"type": "string", "minLength": 1, "description": "Content API token"});
    let debug = json!({"type": "boolean"});
    let id = json!({"type": "string", "minLength": 1});
    let schemas = [
        (
            "get",
            json!({
                "type": "object",
                "properties": {"apiToken": token, "recordId": id, "debug": debug},
                "required": ["apiToken", "recordId"]
            }),
            "Fetch one record by id",
        ),
        (
            "create",
            json!({
                "type": "object",
                "properties": {
                    "apiToken": token,
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "status": {"type": "string", "enum": ["draft", "published"], "default": "draft"},
                    "debug": debug
                },
                "required": ["apiToken", "title"]
            }),
            "Create a record",
        ),
        (
            "update",
            json!({
                "type": "object",
                "properties": {
                    "apiToken": token,
                    "recordId": id,
                    "title": {"type": "string"},
                    "version": {"type": "integer", "minimum": 1},
                    "debug": debug
                },
                "required": ["apiToken", "recordId", "version"]
            }),
            "Update a record",
        ),
        (
            "delete",
            json!({
                "type": "object",
                "properties": {"apiToken": token, "recordId": id, "debug": debug},
                "required": ["apiToken", "recordId"]
            }),
            "Delete a record",
        ),
        (
            "list",
            json!({
                "type": "object",
                "properties": {
                    "apiToken": token,
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 20},
                    "debug": debug
                },
                "required": ["apiToken"]
            }),
            "List records",
        ),
        (
            "publish",
            json!({
                "type": "object",
                "properties": {"apiToken": token, "recordId": id, "debug": debug},
                "required": ["apiToken", "recordId"]
            }),
            "Publish a record",
        ),
    ];
    for (name, schema, description) in schemas {
        registry.register(DOMAIN, name, schema, Some(description)).map_err(|err| err.to_string())?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordIdArgs {
    pub record_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateArgs {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArgs {
    pub record_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListArgs {
    pub limit: usize,
}

type Api = Arc<SpyContentApi>;

/// Builds a router for the records domain over `api`.
pub fn records_router(
    api: Arc<SpyContentApi>,
    config: &DispatchConfig,
) -> Result<(ActionRouter<RecordAction>, DispatchRuntime), String> {
    let mut registry = SchemaRegistry::new();
    register_schemas(&mut registry)?;
    let runtime = DispatchRuntime::from_config(config, registry).map_err(|err| err.to_string())?;
    let factory = runtime.handler_factory(DOMAIN, Arc::new(SpyClients {
        api,
    }));
    let router = runtime
        .router::<RecordAction>(DOMAIN)
        .route(RecordAction::Get, get_handler(&factory))
        .route(RecordAction::Create, create_handler(&factory))
        .route(
            RecordAction::Update,
            factory.update(
                ActionSpec::new("update", "Record").id_field("recordId"),
                |api: Api, args: ValidatedArgs<UpdateArgs>, _ctx: OperationContext| async move {
                    let found = api.find(&args.params.record_id).await?;
                    let mut record = found.ok_or_else(|| {
                        ActionError::not_found("Record", Some(args.params.record_id.clone()))
                    })?;
                    if let Some(title) = args.params.title {
                        record["title"] = json!(title);
                    }
                    record["version"] = json!(args.params.version + 1);
                    Ok(record)
                },
            ),
        )
        .route(
            RecordAction::Delete,
            factory.delete(
                ActionSpec::new("delete", "Record").id_field("recordId"),
                |api: Api, args: ValidatedArgs<RecordIdArgs>, _ctx: OperationContext| async move {
                    api.destroy(&args.params.record_id).await
                },
            ),
        )
        .route(
            RecordAction::List,
            factory.list(
                ActionSpec::new("list", "Record"),
                |api: Api, args: ValidatedArgs<ListArgs>, _ctx: OperationContext| async move {
                    api.list(args.params.limit).await
                },
            ),
        )
        .route(
            RecordAction::Publish,
            factory.custom(
                ActionSpec::new("publish", "Record").id_field("recordId"),
                |api: Api, args: ValidatedArgs<RecordIdArgs>, ctx: OperationContext| async move {
                    match api.find(&args.params.record_id).await? {
                        Some(record) => Ok(ResponseEnvelope::success_with_message(
                            json!({"published": record["id"]}),
                            format!("Published via {}", ctx.handler_name),
                        )),
                        None => Err(ActionError::not_found("Record", ctx.resource_id)),
                    }
                },
            ),
        )
        .build()
        .map_err(|err| err.to_string())?;
    Ok((router, runtime))
}

/// Builds the retrieve handler used by `get`.
pub fn get_handler(factory: &HandlerFactory<SpyClients>) -> action_dispatch_core::ComposedHandler {
    factory.retrieve(
        ActionSpec::new("get", "Record").id_field("recordId"),
        |api: Api, args: ValidatedArgs<RecordIdArgs>, _ctx: OperationContext| async move {
            api.find(&args.params.record_id).await
        },
    )
}

/// Builds the create handler used by `create`.
pub fn create_handler(
    factory: &HandlerFactory<SpyClients>,
) -> action_dispatch_core::ComposedHandler {
    factory.create(
        ActionSpec::new("create", "Record"),
        |api: Api, args: ValidatedArgs<CreateArgs>, _ctx: OperationContext| async move {
            let params = args.params;
            api.create(json!({"title": params.title, "body": params.body, "status": params.status}))
                .await
        },
    )
}

/// Returns a default config with the process-wide debug switch set.
pub fn config_with_debug(enabled: bool) -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.debug.enabled = enabled;
    config
}

/// Sample record stored by default.
pub fn sample_record() -> Value {
    json!({"id": "r1", "title": "Hello", "version": 1})
}
