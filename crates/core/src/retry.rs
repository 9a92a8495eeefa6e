//! Bounded wait-and-retry for transient API failures.

use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::ports::Sleeper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-issues allowed after rate-limit answers
    pub max_rate_limit_retries: u32,
    /// Re-issues allowed after transport failures
    pub max_transport_retries: u32,
    /// Wait used when the server gives no `Retry-After`
    pub default_backoff: Duration,
    /// Upper bound on any single wait, server hints included
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 5,
            max_transport_retries: 2,
            default_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails permanently, or a retry ceiling is hit.
    pub fn run<T>(
        &self,
        sleeper: &dyn Sleeper,
        request: &str,
        mut op: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut rate_limited = 0;
        let mut transport = 0;

        loop {
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let wait = match err {
                Error::RateLimited { retry_after } if rate_limited < self.max_rate_limit_retries => {
                    rate_limited += 1;
                    retry_after.unwrap_or(self.default_backoff).min(self.max_backoff)
                }
                Error::Transport(_) if transport < self.max_transport_retries => {
                    transport += 1;
                    self.default_backoff
                }
                other if other.is_transient() => {
                    return Err(Error::RetriesExhausted {
                        attempts: rate_limited + transport + 1,
                        last: Box::new(other),
                    });
                }
                other => return Err(other),
            };

            warn!(
                request,
                attempt = rate_limited + transport,
                wait_secs = wait.as_secs_f64(),
                "transient failure, retrying"
            );
            sleeper.sleep(wait);
        }
    }
}
