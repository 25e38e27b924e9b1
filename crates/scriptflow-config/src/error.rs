//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config references ${{{0}}}, which is not set")]
    UnsetVariable(String),

    #[error("Bad variable pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// First validation error, with the number of further ones.
    #[error("Invalid config at {field}: {message}{}", and_more(.others))]
    Invalid {
        field: String,
        message: String,
        others: usize,
    },
}

fn and_more(others: &usize) -> String {
    match others {
        0 => String::new(),
        1 => " (and 1 more error)".to_string(),
        n => format!(" (and {} more errors)", n),
    }
}

impl ConfigError {
    /// Config field the error is about, when it is about one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }
}
