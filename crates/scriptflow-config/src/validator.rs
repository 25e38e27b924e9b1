//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// The first error as a [`ConfigError`] counting the rest, if any.
    pub fn into_error(self) -> Option<ConfigError> {
        let others = self.errors.len().saturating_sub(1);
        self.errors.into_iter().next().map(|e| ConfigError::Invalid {
            field: e.path,
            message: e.message,
            others,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_playback(config, &mut result);
        Self::validate_resolver(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_playback(config: &Config, result: &mut ValidationResult) {
        let playback = &config.playback;

        if playback.retry_base_delay_ms > playback.retry_max_delay_ms {
            result.add_error(ValidationError::new(
                "playback.retry_base_delay_ms",
                "retry_base_delay_ms must not exceed retry_max_delay_ms",
            ));
        }

        if playback.retry_timeout_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "playback.retry_timeout_ms",
                "retry_timeout_ms is 0, retriable errors will not be retried",
            ));
        }

        if playback.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "playback.backoff_multiplier",
                "backoff_multiplier must be at least 1.0",
            ));
        }

        if playback.default_context.is_empty() {
            result.add_error(ValidationError::new(
                "playback.default_context",
                "Default context cannot be empty",
            ));
        }
    }

    fn validate_resolver(config: &Config, result: &mut ValidationResult) {
        let renames = &config.resolver.renames;
        let mut names: Vec<&String> = renames.keys().collect();
        names.sort();

        for from in names {
            let to = &renames[from];
            if to.is_empty() {
                result.add_error(ValidationError::new(
                    format!("resolver.renames.{}", from),
                    "Rename target cannot be empty",
                ));
            } else if renames.contains_key(to) {
                result.add_error(ValidationError::new(
                    format!("resolver.renames.{}", from),
                    format!("Rename target '{}' is itself renamed", to),
                ));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
