//! Errors raised while loading or playing back a script.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::UnitKind;

/// Engine error taxonomy.
///
/// Retriable errors describe a runtime condition that is not met *yet*
/// (element not found, value not parseable) and are subject to the
/// `retry` policy. Everything else surfaces immediately.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Structural or configuration defect in the script.
    #[error("Invalid script: {message}")]
    InvalidScript { message: String, details: Value },

    /// A runtime expectation is not currently met.
    #[error("{message}")]
    Playback {
        code: String,
        message: String,
        details: Value,
        retry: bool,
    },

    /// An element value has the wrong JSON type for the pipe or action.
    #[error("Expected {expected} value, got {actual}")]
    ValueType { expected: String, actual: String },

    /// Failure raised deliberately by the script author.
    #[error("{code}: {message}")]
    Scripted {
        code: String,
        message: String,
        details: Value,
        retry: bool,
        website_message: Option<String>,
    },

    /// No implementation is registered for a type name.
    #[error("Unresolved {kind} type: {type_name}")]
    Unresolved { kind: UnitKind, type_name: String },

    /// The playback was paused or cancelled from outside.
    #[error("Playback interrupted: {0}")]
    Interrupted(String),

    /// The page capability failed.
    #[error("Page error: {message}")]
    Page { message: String, retry: bool },
}

impl EngineError {
    pub fn invalid_script(message: impl Into<String>) -> Self {
        Self::InvalidScript {
            message: message.into(),
            details: Value::Null,
        }
    }

    /// A retriable playback error with the generic `PlaybackError` code.
    pub fn playback(message: impl Into<String>) -> Self {
        Self::playback_code("PlaybackError", message)
    }

    pub fn playback_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Playback {
            code: code.into(),
            message: message.into(),
            details: Value::Null,
            retry: true,
        }
    }

    /// Type mismatch for `value`, reporting its JSON type name.
    pub fn value_type(expected: impl Into<String>, value: &Value) -> Self {
        Self::ValueType {
            expected: expected.into(),
            actual: crate::element::value_type_name(value).to_string(),
        }
    }

    pub fn scripted(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scripted {
            code: code.into(),
            message: message.into(),
            details: Value::Null,
            retry: false,
            website_message: None,
        }
    }

    pub fn unresolved(kind: UnitKind, type_name: impl Into<String>) -> Self {
        Self::Unresolved {
            kind,
            type_name: type_name.into(),
        }
    }

    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
            retry: true,
        }
    }

    /// Attach structured details. Variants without a details slot are
    /// returned unchanged.
    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            Self::InvalidScript { details, .. }
            | Self::Playback { details, .. }
            | Self::Scripted { details, .. } => *details = value,
            _ => {}
        }
        self
    }

    /// Override the retry flag of playback, scripted and page errors.
    pub fn with_retry(mut self, value: bool) -> Self {
        match &mut self {
            Self::Playback { retry, .. } | Self::Scripted { retry, .. } | Self::Page { retry, .. } => {
                *retry = value
            }
            _ => {}
        }
        self
    }

    pub fn with_website_message(mut self, value: impl Into<String>) -> Self {
        if let Self::Scripted {
            website_message, ..
        } = &mut self
        {
            *website_message = Some(value.into());
        }
        self
    }

    /// Stable error code consumers match on.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidScript { .. } => "InvalidScript",
            Self::Playback { code, .. } => code,
            Self::ValueType { .. } => "ValueTypeError",
            Self::Scripted { code, .. } => code,
            Self::Unresolved { .. } => "UnresolvedType",
            Self::Interrupted(_) => "PlaybackInterrupted",
            Self::Page { .. } => "PageError",
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Playback { retry, .. } | Self::Scripted { retry, .. } | Self::Page { retry, .. } => {
                *retry
            }
            Self::ValueType { .. } => true,
            Self::InvalidScript { .. } | Self::Unresolved { .. } | Self::Interrupted(_) => false,
        }
    }

    /// Whether the error was raised intentionally by the script.
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::Scripted { .. })
    }

    pub fn details(&self) -> Value {
        match self {
            Self::InvalidScript { details, .. }
            | Self::Playback { details, .. }
            | Self::Scripted { details, .. } => details.clone(),
            Self::ValueType { expected, actual } => {
                serde_json::json!({ "expected": expected, "actual": actual })
            }
            Self::Unresolved { kind, type_name } => {
                serde_json::json!({ "kind": kind, "type": type_name })
            }
            Self::Interrupted(_) | Self::Page { .. } => Value::Null,
        }
    }

    /// Serializable snapshot of this error.
    pub fn info(&self) -> ErrorInfo {
        let website_message = match self {
            Self::Scripted {
                website_message, ..
            } => website_message.clone(),
            _ => None,
        };
        let message = match self {
            Self::Playback { message, .. }
            | Self::Scripted { message, .. }
            | Self::InvalidScript { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorInfo {
            code: self.code().to_string(),
            message,
            retry: self.is_retriable(),
            details: self.details(),
            script_error: self.is_script_error(),
            website_message,
        }
    }
}

/// The error shape loggers and orchestrators rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub retry: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
    #[serde(default)]
    pub script_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_message: Option<String>,
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
