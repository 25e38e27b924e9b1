//! Output and input events exchanged between a running script and the
//! outside world.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::EngineError;

#[async_trait]
pub trait ScriptIo: Send + Sync {
    /// Emit an output.
    async fn send_output(&self, key: &str, data: Value) -> Result<(), EngineError>;

    /// Obtain an input, waiting for it if the implementation supports that.
    async fn request_input(&self, key: &str) -> Result<Value, EngineError>;

    /// The input if it is already available.
    fn peek_input(&self, key: &str) -> Option<Value>;

    /// Forget an input so that the next request asks for it again.
    fn reset_input(&self, key: &str);
}

/// In-memory I/O. Inputs are provided up front; outputs are collected in
/// emission order.
#[derive(Default)]
pub struct MemoryIo {
    inputs: Mutex<HashMap<String, Value>>,
    outputs: Mutex<Vec<(String, Value)>>,
}

impl MemoryIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(inputs: HashMap<String, Value>) -> Self {
        Self {
            inputs: Mutex::new(inputs),
            outputs: Mutex::new(Vec::new()),
        }
    }

    pub fn set_input(&self, key: impl Into<String>, value: Value) {
        self.inputs.lock().insert(key.into(), value);
    }

    /// All outputs emitted so far.
    pub fn outputs(&self) -> Vec<(String, Value)> {
        self.outputs.lock().clone()
    }

    /// The most recent output emitted under `key`.
    pub fn output(&self, key: &str) -> Option<Value> {
        self.outputs
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl ScriptIo for MemoryIo {
    async fn send_output(&self, key: &str, data: Value) -> Result<(), EngineError> {
        self.outputs.lock().push((key.to_string(), data));
        Ok(())
    }

    async fn request_input(&self, key: &str) -> Result<Value, EngineError> {
        self.peek_input(key).ok_or_else(|| {
            EngineError::playback_code("InputNotProvided", format!("Input {} is not provided", key))
                .with_details(serde_json::json!({ "key": key }))
                .with_retry(false)
        })
    }

    fn peek_input(&self, key: &str) -> Option<Value> {
        self.inputs.lock().get(key).cloned()
    }

    fn reset_input(&self, key: &str) {
        self.inputs.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_outputs_in_order() {
        let io = MemoryIo::new();
        io.send_output("a", json!(1)).await.unwrap();
        io.send_output("b", json!(2)).await.unwrap();
        io.send_output("a", json!(3)).await.unwrap();

        let outputs = io.outputs();
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0], ("a".to_string(), json!(1)));
        assert_eq!(io.output("a"), Some(json!(3)));
        assert_eq!(io.output("missing"), None);
    }

    #[tokio::test]
    async fn test_request_input() {
        let io = MemoryIo::with_inputs(HashMap::from([("email".to_string(), json!("a@b.c"))]));
        assert_eq!(io.request_input("email").await.unwrap(), json!("a@b.c"));

        let err = io.request_input("password").await.unwrap_err();
        assert_eq!(err.code(), "InputNotProvided");
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_peek_and_reset_input() {
        let io = MemoryIo::new();
        assert!(io.peek_input("k").is_none());
        io.set_input("k", json!("v"));
        assert_eq!(io.peek_input("k"), Some(json!("v")));
        io.reset_input("k");
        assert!(io.peek_input("k").is_none());
        assert!(io.request_input("k").await.is_err());
    }
}
