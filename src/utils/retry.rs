//! Retry utilities with exponential backoff for resilient API calls.
//!
//! The delay before retry `n` (1-based attempt that just failed) is
//! `base_delay * 2^(n-1)`, capped at `max_delay`. Only
//! [`PubMedError::TransientFetch`] is retried; when attempts run out the last
//! transient error is converted into a terminal one.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::pubmed::PubMedError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (values below 1 act as 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Set the delay cap
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Effective attempt budget
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// How a single attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed(PubMedError),
}

/// Record of one attempt, kept only for the duration of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// What was being fetched (usually the URL)
    pub target: String,
    /// 1-based attempt number
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    /// Backoff scheduled before the next attempt; `None` when no retry follows
    pub delay: Option<Duration>,
}

/// Final result plus the attempt log
#[derive(Debug)]
pub struct RetryReport<T> {
    pub result: Result<T, PubMedError>,
    pub attempts: Vec<FetchAttempt>,
}

impl<T> RetryReport<T> {
    /// Delays actually waited between attempts, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.attempts.iter().filter_map(|a| a.delay).collect()
    }
}

/// Execute an async operation with retry logic, returning the attempt log
pub async fn with_retry_detailed<T, F, Fut>(
    config: RetryConfig,
    target: &str,
    mut operation: F,
) -> RetryReport<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PubMedError>>,
{
    let max_attempts = config.attempts();
    let mut attempts = Vec::new();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        "{} succeeded on attempt {} after {} transient failures",
                        target,
                        attempt,
                        attempt - 1
                    );
                }
                attempts.push(FetchAttempt {
                    target: target.to_string(),
                    attempt,
                    outcome: AttemptOutcome::Success,
                    delay: None,
                });
                return RetryReport {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let delay = config.delay_for(attempt);
                tracing::debug!(
                    "Transient error on attempt {}/{} for {}: {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    target,
                    error,
                    delay
                );
                attempts.push(FetchAttempt {
                    target: target.to_string(),
                    attempt,
                    outcome: AttemptOutcome::Failed(error),
                    delay: Some(delay),
                });
                sleep(delay).await;
            }
            Err(error) => {
                if error.is_transient() {
                    tracing::warn!(
                        "{} failed after {} attempts: {}",
                        target,
                        attempt,
                        error
                    );
                } else {
                    tracing::debug!("Permanent error for {}: {}", target, error);
                }
                let error = error.into_terminal(attempt);
                attempts.push(FetchAttempt {
                    target: target.to_string(),
                    attempt,
                    outcome: AttemptOutcome::Failed(error.clone()),
                    delay: None,
                });
                return RetryReport {
                    result: Err(error),
                    attempts,
                };
            }
        }
    }
}

/// Execute an async operation with retry logic
pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    target: &str,
    operation: F,
) -> Result<T, PubMedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PubMedError>>,
{
    with_retry_detailed(config, target, operation).await.result
}
