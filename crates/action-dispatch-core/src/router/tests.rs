// crates/action-dispatch-core/src/router/tests.rs
// ============================================================================
// Module: Action Router Unit Tests
// Description: Unit tests for hint policy, construction, and observation.
// Purpose: Validate stage ordering and audit/metric emission.
// Dependencies: action-dispatch-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! Uses a two-action domain with echo handlers and recording sinks.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::sync::Mutex;
use std::time::Duration;

use super::*;
use crate::middleware::BoxFuture;
use crate::registry::SchemaRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NoteAction {
    Get,
    Create,
}

impl ActionSet for NoteAction {
    fn all() -> &'static [Self] {
        &[Self::Get, Self::Create]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
        }
    }
}

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<DispatchAuditEvent>>,
}

impl DispatchAuditSink for RecordingAudit {
    fn record(&self, event: &DispatchAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
struct RecordingMetrics {
    requests: Mutex<Vec<DispatchMetricEvent>>,
    latencies: Mutex<usize>,
}

impl DispatchMetrics for RecordingMetrics {
    fn record_request(&self, event: DispatchMetricEvent) {
        self.requests.lock().unwrap().push(event);
    }

    fn record_latency(&self, _event: DispatchMetricEvent, _latency: Duration) {
        *self.latencies.lock().unwrap() += 1;
    }
}

fn registry() -> SharedSchemaRegistry {
    let schema = json!({
        "type": "object",
        "properties": {"apiToken": {"type": "string"}, "title": {"type": "string"}},
        "required": ["apiToken"]
    });
    let mut registry = SchemaRegistry::new();
    registry.register("notes", "get", schema.clone(), None).unwrap();
    registry.register("notes", "create", schema, Some("Create a note")).unwrap();
    registry.freeze()
}

fn echo() -> ComposedHandler {
    Arc::new(|args: Value| -> BoxFuture<ResponseEnvelope> {
        Box::pin(async move { ResponseEnvelope::success(args) })
    })
}

fn router(
    audit: Arc<RecordingAudit>,
    metrics: Arc<RecordingMetrics>,
) -> ActionRouter<NoteAction> {
    ActionRouterBuilder::new("notes", registry())
        .route(NoteAction::Get, echo())
        .route(NoteAction::Create, echo())
        .audit(audit)
        .metrics(metrics)
        .build()
        .unwrap()
}

#[test]
fn hint_policy_counts_keys_without_debug() {
    let policy = HintPolicy::default();
    assert!(policy.should_hint("get", &json!({})));
    assert!(policy.should_hint("get", &json!({"debug": true})));
    assert!(policy.should_hint("get", &Value::Null));
    assert!(!policy.should_hint("get", &json!({"apiToken": "t"})));
    assert!(policy.should_hint("create", &json!({"apiToken": "t", "title": "x"})));
    assert!(!policy.should_hint("create", &json!({"apiToken": "t", "title": "x", "body": "y"})));
    assert!(!HintPolicy::disabled().should_hint("get", &json!({})));
}

#[test]
fn build_requires_every_handler() {
    let err = ActionRouterBuilder::<NoteAction>::new("notes", registry())
        .route(NoteAction::Get, echo())
        .build()
        .err()
        .unwrap();
    assert_eq!(
        err,
        RouterError::MissingHandler {
            domain: "notes".to_string(),
            action: "create".to_string()
        }
    );
}

#[test]
fn build_requires_every_schema() {
    let mut partial = SchemaRegistry::new();
    partial.register("notes", "get", json!({"type": "object"}), None).unwrap();
    let err = ActionRouterBuilder::<NoteAction>::new("notes", partial.freeze())
        .route(NoteAction::Get, echo())
        .route(NoteAction::Create, echo())
        .build()
        .err()
        .unwrap();
    assert_eq!(err.code(), "schema_missing");
}

#[tokio::test]
async fn unknown_action_precedes_hint() {
    let audit = Arc::new(RecordingAudit::default());
    let router = router(Arc::clone(&audit), Arc::new(RecordingMetrics::default()));
    let envelope = router.dispatch(ActionRequest::new("archive", json!({}))).await;
    assert!(envelope.message().unwrap().contains("Valid actions: get, create"));
    assert_eq!(envelope.data().unwrap()["valid_actions"], json!(["get", "create"]));
    let events = audit.events.lock().unwrap();
    assert_eq!(events[0].short_circuit, Some(ShortCircuit::UnknownAction));
    assert_eq!(events[0].error_kind.as_deref(), Some("unknown_action"));
}

#[tokio::test]
async fn invalid_args_include_schema_shape() {
    let router = router(Arc::default(), Arc::default());
    let envelope = router.dispatch(ActionRequest::new("get", json!({"title": 5}))).await;
    let data = envelope.data().unwrap();
    assert_eq!(data["kind"], json!("validation"));
    assert_eq!(data["schema"]["name"], json!("notes:get"));
    let paths: Vec<&str> =
        data["issues"].as_array().unwrap().iter().filter_map(|i| i["path"].as_str()).collect();
    assert!(paths.contains(&"apiToken"));
    assert!(paths.contains(&"title"));
}

#[tokio::test]
async fn successful_dispatch_is_observed() {
    let audit = Arc::new(RecordingAudit::default());
    let metrics = Arc::new(RecordingMetrics::default());
    let router = router(Arc::clone(&audit), Arc::clone(&metrics));
    let args = json!({"apiToken": "t"});
    let envelope = router.dispatch(ActionRequest::new("get", args.clone())).await;
    assert_eq!(envelope, ResponseEnvelope::success(args));
    let event = audit.events.lock().unwrap()[0].clone();
    assert_eq!(event.outcome, DispatchOutcome::Ok);
    assert_eq!(event.short_circuit, None);
    assert_eq!(metrics.requests.lock().unwrap()[0].action, "get");
    assert_eq!(*metrics.latencies.lock().unwrap(), 1);
}

#[tokio::test]
async fn raw_requests_are_decoded() {
    let router = router(Arc::default(), Arc::default());
    let envelope = router.dispatch_value(json!({"action": "get"})).await;
    assert_eq!(envelope.data().unwrap()["kind"], json!("parameters_required"));
    let envelope = router.dispatch_value(json!({"args": {}})).await;
    assert_eq!(envelope.data().unwrap()["kind"], json!("invalid_request"));
}

#[test]
fn describe_serves_documentation() {
    let router = router(Arc::default(), Arc::default());
    let envelope = router.describe("create");
    assert!(envelope.is_success());
    assert_eq!(envelope.data().unwrap()["description"], json!("Create a note"));
    assert_eq!(router.actions(), vec!["get", "create"]);
}
