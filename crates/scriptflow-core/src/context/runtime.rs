//! Per-step runtime context.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::io::{MemoryIo, ScriptIo};
use scriptflow_protocols::page::Page;

use super::{BrowserHandle, Definitions, Globals, Introspection, LocalsStack};
use crate::retry::RetryConfig;

/// Context passed explicitly into every `exec` and `apply` call.
///
/// Cheap to clone: all shared services are reference counted, and clones
/// see the same globals, locals stack and cancellation token.
#[derive(Clone)]
pub struct RuntimeCtx {
    script_id: String,
    context_name: String,
    action_id: Option<String>,
    globals: Arc<Globals>,
    definitions: Arc<Definitions>,
    browser: Arc<BrowserHandle>,
    io: Arc<dyn ScriptIo>,
    introspection: Arc<Introspection>,
    locals: LocalsStack,
    cancel: CancellationToken,
    retry: RetryConfig,
}

impl RuntimeCtx {
    /// A standalone context with fresh services and in-memory I/O.
    pub fn new(script_id: impl Into<String>) -> Self {
        Self {
            script_id: script_id.into(),
            context_name: "main".to_string(),
            action_id: None,
            globals: Arc::new(Globals::new()),
            definitions: Arc::new(Definitions::new()),
            browser: Arc::new(BrowserHandle::new()),
            io: Arc::new(MemoryIo::new()),
            introspection: Arc::new(Introspection::default()),
            locals: LocalsStack::new(),
            cancel: CancellationToken::new(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_context_name(mut self, name: impl Into<String>) -> Self {
        self.context_name = name.into();
        self
    }

    pub fn with_globals(mut self, globals: Arc<Globals>) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_definitions(mut self, definitions: Arc<Definitions>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn with_browser(mut self, browser: Arc<BrowserHandle>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_io(mut self, io: Arc<dyn ScriptIo>) -> Self {
        self.io = io;
        self
    }

    pub fn with_introspection(mut self, introspection: Arc<Introspection>) -> Self {
        self.introspection = introspection;
        self
    }

    pub fn with_locals(mut self, locals: LocalsStack) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// A copy bound to the action being executed.
    pub fn for_action(&self, action_id: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.action_id = Some(action_id.into());
        ctx
    }

    pub fn script_id(&self) -> &str {
        &self.script_id
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn action_id(&self) -> Option<&str> {
        self.action_id.as_deref()
    }

    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    pub fn definitions(&self) -> &Arc<Definitions> {
        &self.definitions
    }

    pub fn browser(&self) -> &Arc<BrowserHandle> {
        &self.browser
    }

    pub fn io(&self) -> &Arc<dyn ScriptIo> {
        &self.io
    }

    pub fn introspection(&self) -> &Arc<Introspection> {
        &self.introspection
    }

    pub fn locals(&self) -> &LocalsStack {
        &self.locals
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// The attached page.
    pub fn page(&self) -> Result<Arc<dyn Page>, EngineError> {
        self.browser.page()
    }

    /// Interruption check run before every action and pipe.
    pub fn tick(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Interrupted(format!(
                "script {} was interrupted",
                self.script_id
            )));
        }
        Ok(())
    }

    /// Element set children see as their implicit input.
    pub fn scope(&self) -> Vec<Element> {
        self.locals.scope()
    }

    pub fn set_local(&self, key: impl Into<String>, elements: Vec<Element>) {
        self.locals.set(key, elements);
    }

    /// Innermost binding of `key`. Undefined locals are a script defect.
    pub fn get_local(&self, key: &str) -> Result<Vec<Element>, EngineError> {
        self.locals.get(key).ok_or_else(|| {
            EngineError::invalid_script(format!("Local {} is not defined", key))
                .with_details(serde_json::json!({ "key": key }))
        })
    }

    pub fn all_locals(&self) -> Vec<(String, Vec<Element>)> {
        self.locals.all()
    }

    /// Evaluate definition `id` once per input element, concatenating the
    /// results in input order.
    pub async fn eval_definition(&self, id: &str, input: Vec<Element>) -> Result<Vec<Element>, EngineError> {
        let definition = self.definitions.get(id).ok_or_else(|| {
            EngineError::invalid_script(format!("Definition {} not found", id))
                .with_details(serde_json::json!({ "definitionId": id }))
        })?;
        let mut out = Vec::new();
        for element in input {
            out.extend(definition.pipeline.select_all(vec![element], self).await?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for RuntimeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeCtx")
            .field("script_id", &self.script_id)
            .field("context_name", &self.context_name)
            .field("action_id", &self.action_id)
            .field("depth", &self.locals.depth())
            .finish()
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
