//! Execution records for developer tooling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::{EngineError, ErrorInfo};
use scriptflow_protocols::types::UnitKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Action,
    Pipeline,
    Pipe,
}

impl From<UnitKind> for EntryKind {
    fn from(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Action => EntryKind::Action,
            UnitKind::Pipe => EntryKind::Pipe,
        }
    }
}

/// Number of elements an evaluation produced, if it produces elements.
pub trait OutputCount {
    fn output_count(&self) -> Option<usize>;
}

impl OutputCount for Vec<Element> {
    fn output_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl OutputCount for () {
    fn output_count(&self) -> Option<usize> {
        None
    }
}

/// One recorded pipe, pipeline or action evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionEntry {
    pub kind: EntryKind,
    pub unit_id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub input_count: usize,
    pub output_count: Option<usize>,
    pub error: Option<ErrorInfo>,
}

impl IntrospectionEntry {
    pub fn start(kind: EntryKind, unit_id: &str, type_name: &str, input_count: usize) -> Self {
        Self {
            kind,
            unit_id: unit_id.to_string(),
            type_name: type_name.to_string(),
            started_at: Utc::now(),
            duration_ms: 0,
            input_count,
            output_count: None,
            error: None,
        }
    }

    /// Complete the entry with the evaluation result.
    pub fn finish<T: OutputCount>(mut self, started: Instant, result: &Result<T, EngineError>) -> Self {
        self.duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(output) => self.output_count = output.output_count(),
            Err(e) => self.error = Some(e.info()),
        }
        self
    }
}

/// Recorder shared by all runtime contexts of a script.
#[derive(Debug, Default)]
pub struct Introspection {
    enabled: AtomicBool,
    entries: Mutex<Vec<IntrospectionEntry>>,
}

impl Introspection {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Record an entry. `entry` is only built when recording is enabled.
    pub fn record<F>(&self, entry: F)
    where
        F: FnOnce() -> IntrospectionEntry,
    {
        if self.is_enabled() {
            self.entries.lock().push(entry());
        }
    }

    pub fn entries(&self) -> Vec<IntrospectionEntry> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
