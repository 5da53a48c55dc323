//! Exponential backoff that only retries on rate limiting.
//!
//! Any other failure is returned on the first attempt so a broken request is
//! never hidden behind retries. Attempts are unbounded; the loop ends on
//! success, a fatal error, or cancellation.

use crate::utils::error::{ExportError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial_interval: Duration, max_interval: Duration, multiplier: f64) -> Self {
        Self {
            initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_interval`.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let secs = self.initial_interval.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(secs).min(self.max_interval)
    }
}

/// Runs `operation` until it succeeds, fails fatally, or `cancel` fires.
pub async fn with_retry<T, F, Fut>(
    cancel: &CancellationToken,
    policy: &BackoffPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(_) if cancel.is_cancelled() => return Err(ExportError::Cancelled),
            Err(e) if e.is_retryable() => {
                let delay = policy.delay(retry);
                tracing::warn!("{} (retryable), retrying in {:?}", e, delay);
                retry = retry.saturating_add(1);

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!("failed with error: {}", e);
                }
                return Err(e);
            }
        }
    }
}
