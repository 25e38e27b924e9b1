//! Script lifecycle events.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use scriptflow_protocols::error::{EngineError, ErrorInfo};
use scriptflow_protocols::io::ScriptIo;

/// Event emitted while a script plays back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ScriptEvent {
    Started { script_id: String },
    #[serde(rename_all = "camelCase")]
    ActionStarted { id: String, type_name: String },
    Output { key: String, data: Value },
    Paused,
    Success,
    Fail { error: ErrorInfo },
}

/// [`ScriptIo`] wrapper announcing every output on the event channel.
pub(crate) struct EventingIo {
    inner: Arc<dyn ScriptIo>,
    events: broadcast::Sender<ScriptEvent>,
}

impl EventingIo {
    pub(crate) fn new(inner: Arc<dyn ScriptIo>, events: broadcast::Sender<ScriptEvent>) -> Self {
        Self { inner, events }
    }
}

#[async_trait]
impl ScriptIo for EventingIo {
    async fn send_output(&self, key: &str, data: Value) -> Result<(), EngineError> {
        self.inner.send_output(key, data.clone()).await?;
        // No subscribers is fine.
        let _ = self.events.send(ScriptEvent::Output {
            key: key.to_string(),
            data,
        });
        Ok(())
    }

    async fn request_input(&self, key: &str) -> Result<Value, EngineError> {
        self.inner.request_input(key).await
    }

    fn peek_input(&self, key: &str) -> Option<Value> {
        self.inner.peek_input(key)
    }

    fn reset_input(&self, key: &str) {
        self.inner.reset_input(key)
    }
}
