// crates/action-dispatch-core/src/factory/tests.rs
// ============================================================================
// Module: Handler Factory Unit Tests
// Description: Unit tests for the six operation shapes.
// Purpose: Validate default messages, not-found synthesis, and client errors.
// Dependencies: action-dispatch-core, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! Builds handlers over a counting client factory and checks the envelope
//! each operation shape produces.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde_json::json;

use super::*;
use crate::error::ApiError;
use crate::registry::SchemaRegistry;

/// Client factory that counts connections and can reject tokens.
#[derive(Default)]
struct CountingClients {
    connects: AtomicUsize,
}

#[async_trait]
impl ClientFactory for CountingClients {
    type Client = String;

    async fn connect(
        &self,
        credential: &ApiCredential,
        environment: Option<&str>,
    ) -> Result<Self::Client, ActionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if credential.expose() == "revoked" {
            return Err(ApiError::with_status(401).code("INVALID_AUTHORIZATION_HEADER").into());
        }
        Ok(environment.unwrap_or("main").to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemArgs {
    #[serde(default)]
    item_id: Option<String>,
}

fn factory() -> (HandlerFactory<CountingClients>, Arc<CountingClients>) {
    let schema = json!({
        "type": "object",
        "properties": {
            "apiToken": {"type": "string"},
            "environment": {"type": "string"},
            "itemId": {"type": "string"},
            "debug": {"type": "boolean"}
        },
        "required": ["apiToken"]
    });
    let mut registry = SchemaRegistry::new();
    for action in ["create", "get", "update", "delete", "list", "publish"] {
        registry.register("items", action, schema.clone(), None).unwrap();
    }
    let clients = Arc::new(CountingClients::default());
    let factory = HandlerFactory::new(
        "items",
        registry.freeze(),
        Arc::clone(&clients),
        DebugSwitch::new(false),
    );
    (factory, clients)
}

#[tokio::test]
async fn create_uses_default_message() {
    let (factory, _) = factory();
    let handler = factory.create(
        ActionSpec::new("create", "Item"),
        |env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok(json!({"id": "1", "environment": env}))
        },
    );
    let envelope = handler(json!({"apiToken": "t", "environment": "staging"})).await;
    assert_eq!(envelope.message(), Some("Item created successfully."));
    assert_eq!(envelope.data().unwrap()["environment"], json!("staging"));
}

#[tokio::test]
async fn dynamic_message_sees_result() {
    let (factory, _) = factory();
    let handler = factory.create(
        ActionSpec::new("create", "Item")
            .message_with(|data| format!("Created item {}", data["id"].as_str().unwrap_or("?"))),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok(json!({"id": "42"}))
        },
    );
    let envelope = handler(json!({"apiToken": "t"})).await;
    assert_eq!(envelope.message(), Some("Created item 42"));
}

#[tokio::test]
async fn retrieve_none_is_not_found_and_names_identifier() {
    let (factory, _) = factory();
    let handler = factory.retrieve(
        ActionSpec::new("get", "Item").id_field("itemId"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok::<Option<Value>, ActionError>(None)
        },
    );
    let envelope = handler(json!({"apiToken": "t", "itemId": "abc"})).await;
    assert_eq!(envelope.message(), Some("Error in items.get: Item with itemId 'abc' was not found."));
    assert_eq!(envelope.data().unwrap()["kind"], json!("not_found"));
}

#[tokio::test]
async fn retrieve_null_payload_is_not_found() {
    let (factory, _) = factory();
    let handler = factory.retrieve(
        ActionSpec::new("get", "Item").id_field("itemId"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok::<Option<Value>, ActionError>(Some(Value::Null))
        },
    );
    let envelope = handler(json!({"apiToken": "t", "itemId": "abc"})).await;
    assert!(!envelope.is_success());
    assert_eq!(envelope.message(), Some("Error in items.get: Item with itemId 'abc' was not found."));
    assert_eq!(envelope.data().unwrap()["kind"], json!("not_found"));
}

#[tokio::test]
async fn retrieve_passes_identifier_to_operation() {
    let (factory, _) = factory();
    let handler = factory.retrieve(
        ActionSpec::new("get", "Item").id_field("itemId"),
        |_env: String, args: ValidatedArgs<ItemArgs>, ctx: OperationContext| async move {
            assert_eq!(ctx.resource_id, args.params.item_id);
            Ok(Some(json!({"id": ctx.resource_id, "handler": ctx.handler_name})))
        },
    );
    let envelope = handler(json!({"apiToken": "t", "itemId": "abc"})).await;
    assert!(envelope.is_success());
    assert_eq!(envelope.data().unwrap(), &json!({"id": "abc", "handler": "items.get"}));
    assert_eq!(envelope.message(), None);
}

#[tokio::test]
async fn update_and_delete_default_messages() {
    let (factory, _) = factory();
    let update = factory.update(
        ActionSpec::new("update", "Item").id_field("itemId"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok(json!({"title": "new"}))
        },
    );
    let delete = factory.delete(
        ActionSpec::new("delete", "Item").id_field("itemId"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok::<_, ActionError>(json!({"ignored": true}))
        },
    );
    let updated = update(json!({"apiToken": "t", "itemId": "7"})).await;
    assert_eq!(updated.message(), Some("Item 7 was successfully updated."));
    let deleted = delete(json!({"apiToken": "t", "itemId": "7"})).await;
    assert_eq!(deleted.message(), Some("Item 7 was successfully deleted."));
    assert_eq!(deleted.data(), Some(&Value::Null));
}

#[tokio::test]
async fn list_counts_results() {
    let (factory, _) = factory();
    let handler = factory.list(
        ActionSpec::new("list", "Item"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok(vec![json!({"id": "1"}), json!({"id": "2"})])
        },
    );
    let envelope = handler(json!({"apiToken": "t"})).await;
    assert_eq!(envelope.message(), Some("Found 2 Item(s)"));
}

#[tokio::test]
async fn custom_returns_envelope_unchanged() {
    let (factory, _) = factory();
    let handler = factory.custom(
        ActionSpec::new("publish", "Item"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok(ResponseEnvelope::error_with_data("already published", json!({"kind": "custom"})))
        },
    );
    let envelope = handler(json!({"apiToken": "t"})).await;
    assert_eq!(
        envelope,
        ResponseEnvelope::error_with_data("already published", json!({"kind": "custom"}))
    );
}

#[tokio::test]
async fn client_failures_are_classified() {
    let (factory, clients) = factory();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let handler = factory.create(
        ActionSpec::new("create", "Item"),
        move |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { Ok(json!({})) }
        },
    );
    let envelope = handler(json!({"apiToken": "revoked"})).await;
    assert!(envelope.message().unwrap().starts_with("Error in items.create: Invalid API token"));
    assert_eq!(clients.connects.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_args_never_connect() {
    let (factory, clients) = factory();
    let handler = factory.create(
        ActionSpec::new("create", "Item"),
        |_env: String, _args: ValidatedArgs<ItemArgs>, _ctx: OperationContext| async move {
            Ok(json!({}))
        },
    );
    let envelope = handler(json!({"itemId": 5})).await;
    assert!(!envelope.is_success());
    assert_eq!(clients.connects.load(Ordering::SeqCst), 0);
}
