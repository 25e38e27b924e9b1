//! End-to-end playback tests with the standard pipes and flow actions.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use scriptflow_actions_flow::FlowActionsExtension;
use scriptflow_core::registry::{ExtensionRegistry, Resolver};
use scriptflow_core::retry::RetryConfig;
use scriptflow_pipes_std::StdPipesExtension;
use scriptflow_protocols::io::MemoryIo;
use scriptflow_protocols::types::RunStatus;
use scriptflow_runtime::{Script, ScriptEvent, ScriptSettings};

// ============================================================================
// Test Helpers
// ============================================================================

async fn resolver() -> Arc<Resolver> {
    let resolver = Arc::new(Resolver::new());
    let registry = ExtensionRegistry::new();
    registry
        .load(Box::new(StdPipesExtension::new()), Value::Null, resolver.clone())
        .await
        .unwrap();
    registry
        .load(Box::new(FlowActionsExtension::new()), Value::Null, resolver.clone())
        .await
        .unwrap();
    resolver
}

fn settings() -> ScriptSettings {
    ScriptSettings {
        retry: RetryConfig {
            timeout: Duration::from_millis(50),
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Default::default()
    }
}

/// Settings whose retries outlast the interrupt used by the resume tests.
fn patient_settings() -> ScriptSettings {
    let mut settings = settings();
    settings.retry.timeout = Duration::from_secs(10);
    settings
}

fn spec(actions: Value) -> Value {
    json!({ "id": "it", "contexts": [{ "type": "main", "actions": actions }] })
}

async fn script(actions: Value) -> Script {
    script_with(actions, settings()).await
}

async fn script_with(actions: Value, settings: ScriptSettings) -> Script {
    Script::load(&spec(actions), &*resolver().await, settings).unwrap()
}

/// Cancel the script's current token after `delay`.
fn interrupt_after(script: &Script, delay: Duration) -> tokio::task::JoinHandle<()> {
    let token = script.interrupt_handle();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    })
}

fn constant(value: Value) -> Value {
    json!([{ "type": "Value.getJson", "value": value }])
}

fn list(values: Value) -> Value {
    json!([{ "type": "Value.getJson", "value": values }, { "type": "List.fromArray" }])
}

/// Action appending `label` to the `trace` global.
fn mark(label: &str) -> Value {
    json!({ "type": "Global.appendGlobal", "key": "trace", "pipeline": constant(json!(label)) })
}

fn trace(script: &Script) -> Vec<String> {
    match script.globals().get("trace") {
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Branching
// ============================================================================

#[tokio::test]
async fn test_if_chain_enters_exactly_one_branch() {
    for mask in 0..8u8 {
        let (a, b, c) = (mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
        let mut script = script(json!([
            { "type": "Flow.if", "pipeline": constant(json!(a)), "children": [mark("if")] },
            { "type": "Flow.elseIf", "pipeline": constant(json!(b)), "children": [mark("elseIf1")] },
            { "type": "Flow.elseIf", "pipeline": constant(json!(c)), "children": [mark("elseIf2")] },
            { "type": "Flow.else", "children": [mark("else")] },
            mark("after")
        ]))
        .await;

        assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);

        let expected = if a {
            "if"
        } else if b {
            "elseIf1"
        } else if c {
            "elseIf2"
        } else {
            "else"
        };
        assert_eq!(trace(&script), vec![expected, "after"], "a={} b={} c={}", a, b, c);
    }
}

#[tokio::test]
async fn test_else_without_if_fails_the_run() {
    let mut script = script(json!([
        mark("first"),
        { "type": "Flow.else", "id": "orphan", "children": [mark("else")] }
    ]))
    .await;

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "InvalidScript");
    assert_eq!(script.status(), RunStatus::Fail);
    assert_eq!(script.playhead(), Some("orphan"));
}

#[tokio::test]
async fn test_if_chain_inside_each_restarts_per_iteration() {
    let mut script = script(json!([
        { "type": "Flow.each", "pipeline": list(json!([true, false])), "children": [
            { "type": "Flow.if", "pipeline": [], "children": [mark("yes")] },
            { "type": "Flow.else", "children": [mark("no")] }
        ] }
    ]))
    .await;

    script.run_all().await.unwrap();
    assert_eq!(trace(&script), vec!["yes", "no"]);
}

// ============================================================================
// Loops
// ============================================================================

#[tokio::test]
async fn test_each_runs_children_per_element_then_moves_on() {
    let mut script = script(json!([
        { "type": "Flow.each", "pipeline": list(json!(["x", "y"])), "children": [
            { "type": "Global.appendGlobal", "key": "trace", "pipeline": [] }
        ] },
        mark("after")
    ]))
    .await;

    assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);
    assert_eq!(trace(&script), vec!["x", "y", "after"]);
}

#[tokio::test]
async fn test_each_over_empty_list_skips_children() {
    let mut script = script(json!([
        { "type": "Flow.each", "pipeline": list(json!([])), "children": [mark("body")] },
        mark("after")
    ]))
    .await;

    script.run_all().await.unwrap();
    assert_eq!(trace(&script), vec!["after"]);
}

#[tokio::test]
async fn test_nested_each_scopes() {
    let mut script = script(json!([
        { "type": "Flow.forEach", "pipeline": list(json!([["a", "b"], ["c"]])), "children": [
            { "type": "Flow.each", "pipeline": [{ "type": "List.fromArray" }], "children": [
                { "type": "Global.appendGlobal", "key": "trace", "pipeline": [] }
            ] }
        ] }
    ]))
    .await;

    script.run_all().await.unwrap();
    assert_eq!(trace(&script), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_while_stops_when_condition_turns_false() {
    let mut script = script(json!([
        { "type": "Global.setGlobal", "key": "go", "pipeline": constant(json!(true)) },
        { "type": "Flow.while", "pipeline": [{ "type": "Value.getGlobal", "key": "go" }], "children": [
            mark("body"),
            { "type": "Global.setGlobal", "key": "go", "pipeline": constant(json!(false)) }
        ] },
        mark("after")
    ]))
    .await;

    script.run_all().await.unwrap();
    assert_eq!(trace(&script), vec!["body", "after"]);
}

#[tokio::test]
async fn test_while_limit_fails_after_limit_plus_one_bodies() {
    let mut script = script(json!([
        { "type": "Flow.while", "id": "spin", "limit": 10, "pipeline": constant(json!(true)), "children": [
            mark("body")
        ] }
    ]))
    .await;

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "PlaybackError");
    assert!(!err.is_retriable());
    assert_eq!(trace(&script).len(), 11);
    assert_eq!(script.playhead(), Some("spin"));
}

#[tokio::test]
async fn test_each_resumes_at_same_element_after_interrupt() {
    let mut script = script_with(
        json!([
            { "type": "Flow.each", "id": "loop", "pipeline": [
                { "type": "Value.getGlobal", "key": "list" },
                { "type": "List.fromArray" }
            ], "children": [
                { "type": "Global.appendGlobal", "key": "trace", "pipeline": [] }
            ] }
        ]),
        patient_settings(),
    )
    .await;

    let interrupter = interrupt_after(&script, Duration::from_millis(50));
    assert_eq!(script.run_all().await.unwrap(), RunStatus::Paused);
    interrupter.await.unwrap();
    assert_eq!(script.playhead(), Some("loop"));
    assert_eq!(script.playback().state(0).and_then(|s| s.iteration), None);

    script.globals().set("list", json!(["a", "b", "c"]));
    assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);
    assert_eq!(trace(&script), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_each_resumes_after_interrupt_mid_iteration() {
    // `wait` blocks until `gate` is set, which happens after the interrupt.
    let mut script = script_with(
        json!([
            { "type": "Flow.each", "id": "loop", "pipeline": list(json!(["x", "y"])), "children": [
                { "type": "Global.appendGlobal", "key": "trace", "pipeline": [] },
                { "type": "Global.appendGlobal", "id": "wait", "key": "trace",
                  "pipeline": [{ "type": "Value.getGlobal", "key": "gate" }] }
            ] }
        ]),
        patient_settings(),
    )
    .await;

    let interrupter = interrupt_after(&script, Duration::from_millis(50));
    assert_eq!(script.run_all().await.unwrap(), RunStatus::Paused);
    interrupter.await.unwrap();
    assert_eq!(script.playhead(), Some("wait"));
    assert_eq!(trace(&script), vec!["x"]);

    script.globals().set("gate", json!("|"));
    assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);
    assert_eq!(trace(&script), vec!["x", "|", "y", "|"]);
}

#[tokio::test]
async fn test_each_resumes_after_failed_select() {
    let mut script = script(json!([
        { "type": "Flow.each", "id": "loop", "pipeline": [
            { "type": "Value.getGlobal", "key": "list" },
            { "type": "List.fromArray" }
        ], "children": [
            { "type": "Global.appendGlobal", "key": "trace", "pipeline": [] }
        ] },
        mark("after")
    ]))
    .await;

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "GlobalNotFound");
    assert_eq!(script.status(), RunStatus::Fail);
    assert_eq!(script.playhead(), Some("loop"));

    script.globals().set("list", json!(["a", "b"]));
    assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);
    assert_eq!(trace(&script), vec!["a", "b", "after"]);
}

#[tokio::test]
async fn test_while_interrupted_check_does_not_use_an_attempt() {
    let mut script = script_with(
        json!([
            { "type": "Flow.while", "id": "spin", "limit": 1,
              "pipeline": [{ "type": "Value.getGlobal", "key": "go" }], "children": [mark("body")] }
        ]),
        patient_settings(),
    )
    .await;

    let interrupter = interrupt_after(&script, Duration::from_millis(50));
    assert_eq!(script.run_all().await.unwrap(), RunStatus::Paused);
    interrupter.await.unwrap();
    assert_eq!(script.playhead(), Some("spin"));
    assert_eq!(script.playback().state(0).map(|s| s.attempts), Some(0));

    // limit 1 allows two passing checks; the third one fails.
    script.globals().set("go", json!(true));
    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "PlaybackError");
    assert_eq!(err.details(), json!({ "limit": 1 }));
    assert_eq!(trace(&script), vec!["body", "body"]);
    assert_eq!(script.playback().state(0).map(|s| s.attempts), Some(2));
    assert_eq!(script.playhead(), Some("spin"));
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_missing_pipeline_is_invalid_script() {
    let resolver = resolver().await;
    for type_name in ["Flow.if", "Flow.elseIf", "Flow.find", "Flow.expect", "Flow.each", "Flow.while"] {
        let err = Script::load(&spec(json!([{ "type": type_name }])), &resolver, settings())
            .unwrap_err();
        assert_eq!(err.code(), "InvalidScript", "{}", type_name);
        assert!(!err.is_retriable());
    }
}

#[test]
fn test_unit_types_are_exported() {
    assert!(std::any::type_name::<scriptflow_actions_flow::Each>().ends_with("::Each"));
    assert!(std::any::type_name::<scriptflow_pipes_std::MapRange>().ends_with("::MapRange"));
    assert_eq!(scriptflow_actions_flow::catalog().len(), 15);
}

// ============================================================================
// Data flow
// ============================================================================

#[tokio::test]
async fn test_globals_round_trip_and_teardown() {
    let io = Arc::new(MemoryIo::new());
    let mut script = script(json!([
        { "type": "Global.setGlobal", "key": "total", "pipeline": constant(json!(42)) },
        { "type": "Data.sendOutput", "key": "total", "pipeline": [{ "type": "Value.getGlobal", "key": "total" }] }
    ]))
    .await
    .with_io(io.clone());

    script.run_all().await.unwrap();
    assert_eq!(io.output("total"), Some(json!(42)));
    assert_eq!(script.globals().get("total"), Some(json!(42)));

    script.teardown();
    assert!(script.globals().is_empty());
}

#[tokio::test]
async fn test_pipeline_feeds_output() {
    let io = Arc::new(MemoryIo::new());
    let mut script = script(json!([
        { "type": "Data.sendOutput", "key": "kept", "pipeline": [
            { "type": "Value.getJson", "value": "[\"a\", \"bb\", \"a\"]" },
            { "type": "List.fromArray" },
            { "type": "List.filter", "pipeline": [{ "type": "Value.equals", "value": "bb" }] },
            { "type": "List.countBy", "pipeline": [{ "type": "Value.equals", "value": "bb" }] }
        ] }
    ]))
    .await
    .with_io(io.clone());

    script.run_all().await.unwrap();
    assert_eq!(io.output("kept"), Some(json!(1)));
}

#[tokio::test]
async fn test_locals_are_visible_to_later_siblings_only_in_frame() {
    let mut script = script(json!([
        { "type": "Flow.group", "children": [
            { "type": "Local.setLocal", "key": "rows", "pipeline": list(json!([1, 2])) },
            { "type": "Global.appendGlobal", "key": "rows", "pipeline": [{ "type": "Value.getLocal", "key": "rows" }] }
        ] },
        { "type": "Global.appendGlobal", "id": "outside", "key": "rows", "pipeline": [{ "type": "Value.getLocal", "key": "rows" }] }
    ]))
    .await;

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "InvalidScript");
    assert_eq!(script.playhead(), Some("outside"));
    assert_eq!(script.globals().get("rows"), Some(json!([1, 2])));
}

#[tokio::test]
async fn test_find_scopes_children_and_optional_skips() {
    let io = Arc::new(MemoryIo::new());
    let mut script = script(json!([
        { "type": "Flow.find", "pipeline": constant(json!({ "name": "Widget" })), "children": [
            { "type": "Data.sendOutput", "key": "name", "pipeline": [{ "type": "Value.getPath", "path": "name" }] }
        ] },
        { "type": "Flow.find", "optional": true, "pipeline": list(json!([])), "children": [mark("never")] },
        mark("after")
    ]))
    .await
    .with_io(io.clone());

    script.run_all().await.unwrap();
    assert_eq!(io.output("name"), Some(json!("Widget")));
    assert_eq!(trace(&script), vec!["after"]);
}

#[tokio::test]
async fn test_send_output_emits_event() {
    let mut script = script(json!([
        { "type": "Data.sendOutput", "key": "price", "pipeline": constant(json!(9.5)) }
    ]))
    .await;
    let mut rx = script.subscribe();

    script.run_all().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&ScriptEvent::Output {
        key: "price".to_string(),
        data: json!(9.5)
    }));
    assert_eq!(events.last(), Some(&ScriptEvent::Success));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_expect_failure_carries_scripted_code() {
    let mut script = script(json!([
        { "type": "Flow.expect", "id": "check", "errorCode": "NotLoggedIn", "message": "Login required",
          "timeout": 0, "pipeline": constant(json!(false)) },
        mark("after")
    ]))
    .await;
    let mut rx = script.subscribe();

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "NotLoggedIn");
    assert!(err.is_script_error());
    assert_eq!(script.playhead(), Some("check"));
    assert!(trace(&script).is_empty());

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    match last {
        Some(ScriptEvent::Fail { error }) => assert_eq!(error.code, "NotLoggedIn"),
        other => panic!("expected a fail event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fail_in_else_branch() {
    let mut script = script(json!([
        { "type": "Flow.if", "pipeline": constant(json!(false)), "children": [mark("ok")] },
        { "type": "Flow.else", "children": [
            { "type": "Flow.fail", "errorCode": "NoResults", "message": "Nothing found" }
        ] }
    ]))
    .await;

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "NoResults");
    assert!(!err.is_retriable());
    assert_eq!(script.status(), RunStatus::Fail);
}

#[tokio::test]
async fn test_step_through_each() {
    let mut script = script(json!([
        { "type": "Flow.each", "id": "loop", "pipeline": list(json!(["x"])), "children": [
            { "type": "Global.appendGlobal", "id": "body", "key": "trace", "pipeline": [] }
        ] }
    ]))
    .await;

    assert_eq!(script.run_action().await.unwrap(), RunStatus::Paused);
    assert_eq!(script.playhead(), Some("body"));
    assert_eq!(script.run_action().await.unwrap(), RunStatus::Paused);
    assert_eq!(script.playhead(), Some("loop"));
    assert_eq!(script.run_action().await.unwrap(), RunStatus::Success);
    assert_eq!(trace(&script), vec!["x"]);
}
