// src/retry.rs
use crate::error::{AutomationError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op` until it succeeds, the attempts run out, or it fails fatally.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match op().await {
                Ok(v) => {
                    if attempt > 1 {
                        debug!(%what, attempt, "succeeded after retry");
                    }
                    return Ok(v);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%what, attempt, attempts, error = %e, "attempt failed");
                    last_err = Some(e);
                    if attempt < attempts {
                        sleep(self.delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AutomationError::NotFound(what.to_string())))
    }
}
