//! Retrying transport: bounded attempts with exponential backoff around one
//! network operation.

use crate::error::GenerationError;
use crate::timing::Sleeper;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Factor applied to the delay after every further failure
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    5_000
}

fn default_multiplier() -> u32 {
    2
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay slept after failed attempt `attempt` (1-based):
    /// `initial_delay * multiplier^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay().saturating_mul(factor)
    }
}

/// Runs an operation until it succeeds, fails permanently, or spends its attempts.
#[derive(Clone)]
pub struct RetryingTransport {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingTransport {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Invoke `call` with the 1-based attempt number.
    ///
    /// Only [`GenerationError::is_transient`] failures are retried. Anything else is
    /// returned untouched after the attempt that produced it. When the budget is
    /// spent the last transient error is wrapped in
    /// [`GenerationError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay();
        let mut attempt = 1;

        loop {
            match call(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => {
                    debug!(operation, attempt, error = %err, "Non-transient failure, not retrying");
                    return Err(err);
                }
                Err(err) if attempt >= max_attempts => {
                    warn!(operation, attempts = attempt, error = %err, "Retry budget exhausted");
                    return Err(GenerationError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    delay = delay.saturating_mul(self.policy.multiplier.max(1));
                    attempt += 1;
                }
            }
        }
    }
}
