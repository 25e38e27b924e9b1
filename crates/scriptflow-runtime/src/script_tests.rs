use super::*;
use crate::mock_units::{self, traced};
use scriptflow_protocols::element::{Element, NodeRef};
use scriptflow_protocols::page::Page;
use serde_json::json;

fn script(contexts: Value) -> Script {
    let resolver = mock_units::resolver();
    Script::load(&json!({ "id": "s1", "contexts": contexts }), &resolver, ScriptSettings::default()).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<ScriptEvent>) -> Vec<ScriptEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

struct StubPage;

#[async_trait::async_trait]
impl Page for StubPage {
    fn id(&self) -> &str {
        "stub"
    }

    async fn url(&self) -> Result<String, EngineError> {
        Ok("https://example.test/".to_string())
    }

    async fn navigate(&self, _url: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn query_all(&self, _scope: &NodeRef, _selector: &str) -> Result<Vec<NodeRef>, EngineError> {
        Ok(Vec::new())
    }

    async fn text_content(&self, _node: &NodeRef) -> Result<String, EngineError> {
        Ok(String::new())
    }

    async fn send_command(&self, _method: &str, _params: Value) -> Result<Value, EngineError> {
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn test_run_all_succeeds_with_events() {
    let mut script = script(json!([{ "actions": [
        { "type": "Test.mark", "id": "a" },
        { "type": "Test.mark", "id": "b" }
    ] }]));
    let mut rx = script.subscribe();

    assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);
    assert_eq!(script.status(), RunStatus::Success);
    assert_eq!(script.playhead(), None);
    assert_eq!(traced(script.globals()), vec!["a", "b"]);

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            ScriptEvent::Started { script_id: "s1".to_string() },
            ScriptEvent::ActionStarted { id: "a".to_string(), type_name: "Test.mark".to_string() },
            ScriptEvent::ActionStarted { id: "b".to_string(), type_name: "Test.mark".to_string() },
            ScriptEvent::Success,
        ]
    );
}

#[tokio::test]
async fn test_run_action_steps_one_at_a_time() {
    let mut script = script(json!([{ "actions": [
        { "type": "Test.mark", "id": "a" },
        { "type": "Test.mark", "id": "b" }
    ] }]));

    assert_eq!(script.run_action().await.unwrap(), RunStatus::Paused);
    assert_eq!(script.playhead(), Some("b"));
    assert_eq!(traced(script.globals()), vec!["a"]);

    assert_eq!(script.run_action().await.unwrap(), RunStatus::Success);
    assert_eq!(script.playhead(), None);
}

#[tokio::test]
async fn test_failure_sets_fail_status_and_keeps_error() {
    let mut script = script(json!([{ "actions": [
        { "type": "Test.mark", "id": "boom", "fail": "playback" }
    ] }]));
    let mut rx = script.subscribe();

    let err = script.run_all().await.unwrap_err();
    assert_eq!(err.code(), "PlaybackError");
    assert_eq!(script.status(), RunStatus::Fail);
    assert_eq!(script.playhead(), Some("boom"));

    let events = drain(&mut rx);
    match events.last() {
        Some(ScriptEvent::Fail { error }) => {
            assert_eq!(error.code, "PlaybackError");
            assert_eq!(error.message, "mock failure");
        }
        other => panic!("expected a fail event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_interrupt_pauses_and_resume_continues() {
    let mut script = script(json!([{ "actions": [
        { "type": "Test.mark", "id": "a", "fail": "interrupt" },
        { "type": "Test.mark", "id": "b" }
    ] }]));

    assert_eq!(script.run_all().await.unwrap(), RunStatus::Paused);
    assert_eq!(script.playhead(), Some("b"));
    assert!(!script.interrupt_handle().is_cancelled());

    assert_eq!(script.run_all().await.unwrap(), RunStatus::Success);
    assert_eq!(traced(script.globals()), vec!["a", "b"]);
}

#[tokio::test]
async fn test_interrupt_before_run_pauses_immediately() {
    let mut script = script(json!([{ "actions": [{ "type": "Test.mark", "id": "a" }] }]));
    script.interrupt();

    assert_eq!(script.run_all().await.unwrap(), RunStatus::Paused);
    assert!(traced(script.globals()).is_empty());
}

#[tokio::test]
async fn test_set_playhead() {
    let mut script = script(json!([
        { "actions": [{ "type": "Test.mark", "id": "a" }, { "type": "Test.mark", "id": "b" }] },
        { "name": "other", "actions": [{ "type": "Test.mark", "id": "o" }] }
    ]));

    script.set_playhead("b").unwrap();
    assert_eq!(script.playhead(), Some("b"));

    script.set_playhead("o").unwrap();
    assert_eq!(script.current_context(), "other");
    script.run_all().await.unwrap();
    assert_eq!(traced(script.globals()), vec!["o"]);

    let err = script.set_playhead("missing").unwrap_err();
    assert_eq!(err.code(), "InvalidScript");
    assert_eq!(err.details()["actionId"], json!("missing"));
}

#[tokio::test]
async fn test_start_context_and_restart() {
    let mut script = script(json!([
        { "actions": [{ "type": "Test.mark", "id": "a" }] },
        { "name": "other", "actions": [{ "type": "Test.mark", "id": "o" }] }
    ]));
    assert_eq!(script.current_context(), "main");

    script.start_context("other").unwrap();
    assert_eq!(script.playhead(), Some("o"));
    assert!(script.start_context("nope").is_err());

    script.restart();
    assert_eq!(script.current_context(), "main");
    assert_eq!(script.playhead(), Some("a"));
}

#[tokio::test]
async fn test_default_context_from_settings() {
    let resolver = mock_units::resolver();
    let settings = ScriptSettings {
        default_context: "other".to_string(),
        ..Default::default()
    };
    let script = Script::load(
        &json!({ "contexts": [
            { "actions": [{ "type": "Test.mark", "id": "a" }] },
            { "name": "other", "actions": [{ "type": "Test.mark", "id": "o" }] }
        ] }),
        &resolver,
        settings,
    )
    .unwrap();
    assert_eq!(script.playhead(), Some("o"));
}

#[tokio::test]
async fn test_match_context() {
    let script = script(json!([
        { "actions": [] },
        { "name": "no-matchers", "actions": [] },
        { "name": "false", "matchers": [{ "type": "Test.const", "value": false }], "actions": [] },
        { "name": "true", "matchers": [{ "type": "Test.const", "value": true }], "actions": [] }
    ]));
    assert_eq!(script.match_context().await.unwrap(), Some("true".to_string()));
}

#[tokio::test]
async fn test_match_context_none() {
    let script = script(json!([
        { "matchers": [{ "type": "Test.const", "value": true }], "actions": [] },
        { "name": "other", "matchers": [{ "type": "Test.const", "value": "yes" }], "actions": [] }
    ]));
    // The default context never matches, and non-boolean results do not count.
    assert_eq!(script.match_context().await.unwrap(), None);
}

#[tokio::test]
async fn test_teardown_clears_session() {
    let mut script = script(json!([{ "actions": [{ "type": "Test.mark", "id": "a" }] }]));
    script.browser().attach(Arc::new(StubPage));
    script.run_all().await.unwrap();
    assert!(!script.globals().is_empty());

    script.teardown();
    assert!(script.globals().is_empty());
    assert!(!script.browser().is_attached());
    assert_eq!(script.status(), RunStatus::Idle);
    assert_eq!(script.playhead(), None);
}

#[tokio::test]
async fn test_definitions_are_shared() {
    let script = script(json!([
        { "definitions": [{ "id": "one", "pipeline": [{ "type": "Test.const", "value": 1 }] }], "actions": [] },
        { "name": "other", "definitions": [{ "id": "two", "pipeline": [] }], "actions": [] }
    ]));
    let definitions = script.runtime().definitions();
    assert!(definitions.contains("one"));
    assert!(definitions.contains("two"));

    let out = script
        .runtime()
        .eval_definition("one", vec![Element::document(json!("x"))])
        .await
        .unwrap();
    assert_eq!(out[0].value(), &json!(1));
}

#[tokio::test]
async fn test_with_io_routes_outputs() {
    let memory = Arc::new(MemoryIo::new());
    let script = script(json!([{ "actions": [] }])).with_io(memory.clone());
    let mut rx = script.subscribe();

    script.runtime().io().send_output("total", json!(3)).await.unwrap();
    assert_eq!(memory.output("total"), Some(json!(3)));
    assert_eq!(
        rx.try_recv().unwrap(),
        ScriptEvent::Output { key: "total".to_string(), data: json!(3) }
    );
}

#[test]
fn test_to_spec() {
    let script = script(json!([{ "actions": [{ "type": "Test.mark", "id": "a" }] }]));
    let spec = script.to_spec();
    assert_eq!(spec["id"], json!("s1"));
    assert_eq!(spec["contexts"][0]["actions"][0]["id"], json!("a"));
}
