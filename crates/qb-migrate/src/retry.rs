//! Retries for transient API failures.
//!
//! Off unless `options.max_retries` is set: by default the first failed
//! request aborts the run. The delay doubles after every attempt.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::error::{Error, Result};

const FIRST_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// How often and how patiently a failed request is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for every further one.
    pub first_delay: Duration,
}

impl RetryPolicy {
    /// Policy for `options.max_retries`.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            first_delay: FIRST_DELAY,
        }
    }

    /// Wait before retry number `retry` (1-based), capped at 30 seconds.
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.first_delay.saturating_mul(factor).min(MAX_DELAY)
    }
}

/// Whether a failed request may succeed when sent again.
///
/// Rate limits, 5xx statuses, timeouts and refused connections are
/// transient. Every other status, legacy error codes and local errors are
/// final.
#[must_use]
pub fn is_transient(error: &Error) -> bool {
    match error {
        Error::RateLimit(_) => true,
        Error::Request { status, .. } => *status >= 500,
        Error::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

/// Runs `request`, repeating it on transient errors as `policy` allows.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut request: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match request().await {
            Err(e) if retry < policy.max_retries && is_transient(&e) => {
                retry += 1;
                let delay = policy.delay(retry);
                warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    operation, e, retry, policy.max_retries, delay
                );
                sleep(delay).await;
            }
            result => return result,
        }
    }
}
