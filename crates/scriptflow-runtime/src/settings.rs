//! Per-script runtime settings derived from the engine configuration.

use scriptflow_config::Config;
use scriptflow_core::retry::RetryConfig;

#[derive(Debug, Clone)]
pub struct ScriptSettings {
    pub retry: RetryConfig,
    pub introspection: bool,
    /// Context the playhead starts in.
    pub default_context: String,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            introspection: false,
            default_context: "main".to_string(),
            event_capacity: 256,
        }
    }
}

impl From<&Config> for ScriptSettings {
    fn from(config: &Config) -> Self {
        let playback = &config.playback;
        Self {
            retry: RetryConfig {
                timeout: playback.retry_timeout(),
                base_delay: playback.retry_base_delay(),
                max_delay: playback.retry_max_delay(),
                backoff_multiplier: playback.backoff_multiplier,
                jitter: playback.jitter,
            },
            introspection: config.introspection.enabled,
            default_context: playback.default_context.clone(),
            ..Default::default()
        }
    }
}
