//! Type registry errors.

use thiserror::Error;

use crate::types::UnitKind;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} type already registered: {type_name}")]
    AlreadyRegistered { kind: UnitKind, type_name: String },

    #[error("{kind} type not found: {type_name}")]
    NotFound { kind: UnitKind, type_name: String },

    #[error("Extension already registered: {0}")]
    ExtensionAlreadyRegistered(String),

    #[error("Extension initialization failed: {0}")]
    InitializationFailed(String),
}
