//! Script container: contexts, globals, I/O and the playback driver.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scriptflow_core::context::{
    BrowserHandle, Definitions, Globals, Introspection, IntrospectionEntry, LocalsStack, RuntimeCtx,
};
use scriptflow_core::registry::Resolver;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::io::{MemoryIo, ScriptIo};
use scriptflow_protocols::types::{PlaybackMode, RunStatus};

use crate::events::{EventingIo, ScriptEvent};
use crate::loader::{script_to_spec, LoadedScript, ScriptLoader};
use crate::playback::Playback;
use crate::settings::ScriptSettings;
use crate::tree::ActionTree;

/// One execution session of a loaded script.
pub struct Script {
    id: String,
    tree: ActionTree,
    playback: Playback,
    runtime: RuntimeCtx,
    io: Arc<dyn ScriptIo>,
    events: broadcast::Sender<ScriptEvent>,
    settings: ScriptSettings,
}

impl Script {
    /// Load a script from its JSON spec.
    pub fn load(spec: &Value, resolver: &Resolver, settings: ScriptSettings) -> Result<Self, EngineError> {
        let loaded = ScriptLoader::new(resolver).load(spec)?;
        Ok(Self::from_loaded(loaded, settings))
    }

    pub fn load_file(path: &Path, resolver: &Resolver, settings: ScriptSettings) -> Result<Self, EngineError> {
        let loaded = ScriptLoader::new(resolver).load_file(path)?;
        Ok(Self::from_loaded(loaded, settings))
    }

    fn from_loaded(loaded: LoadedScript, settings: ScriptSettings) -> Self {
        let LoadedScript { id, tree } = loaded;
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));

        let definitions = Arc::new(Definitions::new());
        for context in tree.contexts() {
            for definition in &context.definitions {
                definitions.insert(definition.clone());
            }
        }

        let io: Arc<dyn ScriptIo> = Arc::new(MemoryIo::new());
        let locals = LocalsStack::new();
        let runtime = RuntimeCtx::new(id.clone())
            .with_globals(Arc::new(Globals::new()))
            .with_definitions(definitions)
            .with_browser(Arc::new(BrowserHandle::new()))
            .with_io(Arc::new(EventingIo::new(io.clone(), events.clone())))
            .with_introspection(Arc::new(Introspection::new(settings.introspection)))
            .with_locals(locals.clone())
            .with_retry(settings.retry.clone());

        let mut script = Self {
            id,
            tree,
            playback: Playback::new(locals),
            runtime,
            io,
            events,
            settings,
        };
        let context = script.tree.context_index(&script.settings.default_context).unwrap_or(0);
        script.start_at(context);
        script
    }

    /// Route script I/O through `io`.
    pub fn with_io(mut self, io: Arc<dyn ScriptIo>) -> Self {
        self.runtime = self
            .runtime
            .clone()
            .with_io(Arc::new(EventingIo::new(io.clone(), self.events.clone())));
        self.io = io;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tree(&self) -> &ActionTree {
        &self.tree
    }

    pub fn status(&self) -> RunStatus {
        self.playback.status()
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Id of the action under the playhead.
    pub fn playhead(&self) -> Option<&str> {
        self.playback.playhead(&self.tree).map(|idx| self.tree.node(idx).id())
    }

    /// Name of the context the playhead is in.
    pub fn current_context(&self) -> &str {
        self.runtime.context_name()
    }

    pub fn runtime(&self) -> &RuntimeCtx {
        &self.runtime
    }

    pub fn globals(&self) -> &Arc<Globals> {
        self.runtime.globals()
    }

    pub fn browser(&self) -> &Arc<BrowserHandle> {
        self.runtime.browser()
    }

    pub fn io(&self) -> &Arc<dyn ScriptIo> {
        &self.io
    }

    pub fn introspection(&self) -> Vec<IntrospectionEntry> {
        self.runtime.introspection().entries()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScriptEvent> {
        self.events.subscribe()
    }

    /// Run until the playhead leaves the context, the script fails or it is
    /// interrupted.
    pub async fn run_all(&mut self) -> Result<RunStatus, EngineError> {
        self.run(PlaybackMode::FullRun).await
    }

    /// Execute the action under the playhead, then pause.
    pub async fn run_action(&mut self) -> Result<RunStatus, EngineError> {
        self.run(PlaybackMode::SingleAction).await
    }

    async fn run(&mut self, mode: PlaybackMode) -> Result<RunStatus, EngineError> {
        self.playback.set_mode(mode);
        self.playback.set_status(RunStatus::Running);
        self.emit(ScriptEvent::Started {
            script_id: self.id.clone(),
        });
        info!(script = %self.id, context = self.runtime.context_name(), mode = ?mode, "Playback started");

        loop {
            let Some(idx) = self.playback.playhead(&self.tree) else {
                return Ok(self.conclude(RunStatus::Success));
            };
            let node = self.tree.node(idx);
            self.emit(ScriptEvent::ActionStarted {
                id: node.id().to_string(),
                type_name: node.type_name().to_string(),
            });

            if let Err(error) = self.playback.step(&self.tree, &self.runtime).await {
                return self.stop_on(error);
            }

            if mode == PlaybackMode::SingleAction {
                let status = match self.playback.path() {
                    Some(_) => RunStatus::Paused,
                    None => RunStatus::Success,
                };
                return Ok(self.conclude(status));
            }
        }
    }

    fn conclude(&mut self, status: RunStatus) -> RunStatus {
        self.playback.set_status(status);
        match status {
            RunStatus::Success => {
                self.emit(ScriptEvent::Success);
                info!(script = %self.id, "Playback finished");
            }
            _ => {
                self.emit(ScriptEvent::Paused);
                info!(script = %self.id, playhead = ?self.playhead(), "Playback paused");
            }
        }
        status
    }

    fn stop_on(&mut self, error: EngineError) -> Result<RunStatus, EngineError> {
        if matches!(error, EngineError::Interrupted(_)) {
            // Next run starts with a fresh token.
            self.runtime = self.runtime.clone().with_cancel_token(CancellationToken::new());
            return Ok(self.conclude(RunStatus::Paused));
        }
        self.playback.set_status(RunStatus::Fail);
        self.emit(ScriptEvent::Fail { error: error.info() });
        warn!(script = %self.id, playhead = ?self.playhead(), code = error.code(), "Playback failed: {}", error);
        Err(error)
    }

    /// Request the running playback to pause at the next boundary.
    pub fn interrupt(&self) {
        self.runtime.cancel_token().cancel();
    }

    /// Token that interrupts the current (or next) run when cancelled.
    pub fn interrupt_handle(&self) -> CancellationToken {
        self.runtime.cancel_token().clone()
    }

    /// Move the playhead onto `action_id`, in whichever context holds it.
    pub fn set_playhead(&mut self, action_id: &str) -> Result<(), EngineError> {
        let idx = self.tree.find(action_id).ok_or_else(|| {
            EngineError::invalid_script(format!("Action {} not found", action_id))
                .with_details(serde_json::json!({ "actionId": action_id }))
        })?;
        let context = self.tree.node(idx).context;
        self.bind_context(context);
        self.playback.set_playhead(&self.tree, idx);
        Ok(())
    }

    /// Put the playhead on the first action of the named context.
    pub fn start_context(&mut self, name: &str) -> Result<(), EngineError> {
        let context = self.tree.context_index(name).ok_or_else(|| {
            EngineError::invalid_script(format!("Context {} not found", name))
                .with_details(serde_json::json!({ "context": name }))
        })?;
        self.start_at(context);
        Ok(())
    }

    /// Start the default context over.
    pub fn restart(&mut self) {
        let context = self.tree.context_index(&self.settings.default_context).unwrap_or(0);
        self.start_at(context);
    }

    fn start_at(&mut self, context: usize) {
        self.bind_context(context);
        self.playback.start(&self.tree, context);
    }

    fn bind_context(&mut self, context: usize) {
        let name = self
            .tree
            .contexts()
            .get(context)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| self.settings.default_context.clone());
        self.runtime = self.runtime.clone().with_context_name(name);
    }

    /// First non-default context whose matchers accept the current page.
    ///
    /// Matchers run on empty input and must yield at least one element, all
    /// valued `true`. A retriable matcher failure counts as no match.
    pub async fn match_context(&self) -> Result<Option<String>, EngineError> {
        for context in self.tree.contexts() {
            if context.name == self.settings.default_context || context.matchers.is_empty() {
                continue;
            }
            let result = match context.matchers.select_all(Vec::new(), &self.runtime).await {
                Ok(result) => result,
                Err(e) if e.is_retriable() => {
                    debug!(context = %context.name, "Matcher failed: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !result.is_empty() && result.iter().all(|el| el.value() == &Value::Bool(true)) {
                return Ok(Some(context.name.clone()));
            }
        }
        Ok(None)
    }

    /// End the session: clear globals, detach the page and drop run state.
    pub fn teardown(&mut self) {
        self.runtime.globals().clear();
        self.runtime.browser().detach();
        self.runtime.introspection().clear();
        self.playback.clear();
        debug!(script = %self.id, "Script torn down");
    }

    /// Spec form of the whole script.
    pub fn to_spec(&self) -> Value {
        script_to_spec(&self.id, &self.tree)
    }

    fn emit(&self, event: ScriptEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("id", &self.id)
            .field("context", &self.runtime.context_name())
            .field("playback", &self.playback)
            .finish()
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
