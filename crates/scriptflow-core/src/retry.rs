//! Retry combinator for fallible pipeline evaluation.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, warn};

use scriptflow_protocols::error::EngineError;

use crate::context::RuntimeCtx;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Default window during which retriable errors are retried.
    pub timeout: Duration,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            let jitter = rand_jitter(delay * 0.1);
            (delay + jitter).max(0.0) as u64
        } else {
            delay as u64
        };

        Duration::from_millis(delay_ms)
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}

/// Per-call overrides of the retry window.
///
/// The configured timeout is clamped into `[timeout_min, timeout_max]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOptions {
    pub timeout_min: Option<Duration>,
    pub timeout_max: Option<Duration>,
}

impl RetryOptions {
    /// Retry for exactly `timeout`.
    pub fn fixed(timeout: Duration) -> Self {
        Self {
            timeout_min: Some(timeout),
            timeout_max: Some(timeout),
        }
    }

    /// Never retry.
    pub fn no_retry() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn window(&self, config: &RetryConfig) -> Duration {
        let mut window = config.timeout;
        if let Some(min) = self.timeout_min {
            window = window.max(min);
        }
        if let Some(max) = self.timeout_max {
            window = window.min(max);
        }
        window
    }
}

/// Run `operation` until it succeeds, fails with a non-retriable error, or
/// the retry window elapses.
///
/// On exhaustion the last retriable error is returned as-is. Cancellation
/// of the context interrupts the backoff delay.
pub async fn retry<T, F, Fut>(ctx: &RuntimeCtx, options: RetryOptions, mut operation: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let config = ctx.retry_config();
    let window = options.window(config);
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        ctx.tick()?;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !error.is_retriable() || started.elapsed() >= window {
            debug!(attempt = attempt + 1, code = error.code(), "Giving up");
            return Err(error);
        }

        let remaining = window.saturating_sub(started.elapsed());
        let delay = config.delay_for_attempt(attempt).min(remaining);
        warn!(
            "Retriable error (attempt {}): {}, retrying in {:?}",
            attempt + 1,
            error,
            delay
        );

        tokio::select! {
            _ = sleep(delay) => {}
            _ = ctx.cancel_token().cancelled() => {
                return Err(EngineError::Interrupted(format!(
                    "script {} was interrupted while retrying",
                    ctx.script_id()
                )));
            }
        }
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
