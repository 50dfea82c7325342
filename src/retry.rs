use std::future::Future;
use std::time::Duration;

use anyhow::Result;

/// Attempt ceiling shared by every network call site. Rate-limit pauses and
/// transient backoffs both consume an attempt.
pub const MAX_RETRIES: u32 = 3;

const BACKOFF_CAP_SECS: u64 = 5;

/// Outcome of a single attempt at a network call.
pub enum Attempt<T> {
    Done(T),
    /// HTTP 429: pause briefly and try again.
    RateLimited,
    /// Connect/timeout/server error: back off and try again.
    Transient(anyhow::Error),
    /// Data-integrity or signing problem: retrying cannot help.
    Fatal(anyhow::Error),
}

/// Explicit retry policy wrapping one network call site.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_cap: Duration,
    pub rate_limit_pause: Duration,
}

impl RetryPolicy {
    pub fn quotes() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            backoff_cap: Duration::from_secs(BACKOFF_CAP_SECS),
            rate_limit_pause: Duration::from_millis(500),
        }
    }

    pub fn orders() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            backoff_cap: Duration::from_secs(BACKOFF_CAP_SECS),
            rate_limit_pause: Duration::from_millis(300),
        }
    }

    /// Runs `op` until it succeeds, fails fatally, or the attempt budget is
    /// spent.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        for attempt in 0..self.max_attempts {
            match op().await {
                Attempt::Done(v) => return Ok(v),
                Attempt::RateLimited => {
                    tracing::warn!(call = what, "rate limited, pausing briefly");
                    tokio::time::sleep(self.rate_limit_pause).await;
                }
                Attempt::Transient(err) => {
                    tracing::warn!(call = what, attempt, error = %err, "transient failure, backing off");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Attempt::Fatal(err) => return Err(err),
            }
        }
        anyhow::bail!("{what}: no success after {} attempts", self.max_attempts)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt)).min(self.backoff_cap)
    }
}
