//! Retry utilities with exponential backoff.
//!
//! Provides retry logic for contended resources using the `backon` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use devpg::retry::{retry_async, RetryConfig};
//!
//! let lock = retry_async(
//!     RetryConfig::for_lock(Duration::from_secs(60)),
//!     || async { try_lock() },
//!     |e| e.is_busy(),
//! ).await;
//! ```

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub factor: f32,
}

impl RetryConfig {
    /// Config for waiting on a lock held by another invocation.
    ///
    /// Backs off from 50ms up to 1s between attempts, with enough retries
    /// that the total wait covers at least `timeout`.
    #[must_use]
    pub fn for_lock(timeout: Duration) -> Self {
        let max_delay = Duration::from_secs(1);
        let max_retries = u32::try_from(timeout.as_millis() / max_delay.as_millis())
            .unwrap_or(u32::MAX)
            .saturating_add(6);

        Self {
            max_retries,
            initial_delay: Duration::from_millis(50),
            max_delay,
            factor: 2.0,
        }
    }

    /// Build the exponential backoff strategy.
    fn build_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .with_factor(self.factor)
    }
}

/// Retry an async operation with exponential backoff.
///
/// `is_retryable` decides which errors are worth another attempt; any other
/// error is returned immediately.
///
/// # Returns
///
/// The result of the operation, or the last error if all retries failed.
pub async fn retry_async<F, Fut, T, E, R>(
    config: RetryConfig,
    operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let backoff = config.build_backoff();
    let max_retries = config.max_retries;

    let mut attempt = 0u32;
    let notify = |err: &E, dur: Duration| {
        attempt += 1;
        debug!(
            attempt = attempt,
            max_retries = max_retries,
            next_delay_ms = dur.as_millis() as u64,
            error = %err,
            "Attempt failed, will retry"
        );
    };

    operation
        .retry(backoff)
        .when(move |e| is_retryable(e))
        .notify(notify)
        .await
}
