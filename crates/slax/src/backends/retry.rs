//! 🔄 Retry: ask again, politely, a bounded number of times.
//!
//! 🧠 Knowledge graph:
//! - Only [`FetchError::is_transient`] failures earn another attempt (transport, 5xx, 429).
//! - Everything else (404, 401/403, bad JSON, other 4xx) comes back on the first try, unwrapped.
//! - Running out of attempts yields `RetriesExhausted { attempts, last }` so callers can still
//!   tell what the final failure was.
//! - Fixed delay. No jitter, no exponential backoff. One user, one process, three knocks.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{FetchError, FetchResult};

/// 🔄 How many times, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// 🚀 Run `attempt` until it succeeds, fails for good, or we run out of patience.
    ///
    /// `what` only shows up in log lines, so make it something a human can grep for.
    pub async fn run<T, F, Fut>(&self, what: &str, mut attempt: F) -> FetchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if tries >= max_attempts => {
                    warn!("💀 {} failed on attempt {}/{}, giving up: {}", what, tries, max_attempts, err);
                    return Err(FetchError::RetriesExhausted {
                        attempts: tries,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        "🔄 {} failed on attempt {}/{}, retrying in {:?}: {}",
                        what, tries, max_attempts, self.delay, err
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
    }
}
