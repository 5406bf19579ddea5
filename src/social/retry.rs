use super::error::{Retry, SocialError};
use crate::clock::Clock;
use std::time::Duration;

/// Bounded retry with a fixed backoff, stretched when the platform throttles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub throttle_multiplier: u32,
}

impl RetryPolicy {
    /// Run `attempt` until it succeeds, fails terminally, or retries run out.
    pub fn run<T>(
        &self,
        clock: &dyn Clock,
        operation: &str,
        mut attempt: impl FnMut() -> Result<T, SocialError>,
    ) -> Result<T, SocialError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match attempt() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let delay = match err.retry() {
                Retry::Never => {
                    tracing::debug!(operation, error = %err, "request rejected, not retrying");
                    return Err(err);
                }
                Retry::Transient => self.backoff,
                Retry::Throttled => self.backoff.saturating_mul(self.throttle_multiplier),
            };
            if attempts > self.max_retries {
                tracing::warn!(
                    operation,
                    attempts,
                    error = %err,
                    "giving up after repeated failures"
                );
                return Err(SocialError::Exhausted {
                    attempts,
                    last: Box::new(err),
                });
            }
            tracing::warn!(
                operation,
                attempt = attempts,
                delay_secs = delay.as_secs(),
                error = %err,
                "request failed, retrying"
            );
            clock.sleep(delay);
        }
    }
}
