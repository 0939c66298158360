//! Retry with capped exponential backoff for transient network failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, VigilError};

/// Backoff schedule for one logical operation.
///
/// `retries` counts re-invocations after the first try, so an operation runs
/// at most `retries + 1` times. The delay before the k-th retry (0-indexed)
/// is `min(max_timeout, min_timeout * factor^k)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: usize,
    pub factor: f64,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    /// When set, each delay is scaled by a random factor in [0.5, 1.0).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            factor: 2.0,
            min_timeout: Duration::from_millis(1000),
            max_timeout: Duration::from_millis(16000),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor.max(1.0);
        self
    }

    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// Delay before the k-th retry (0-indexed).
    ///
    /// The exponent is capped so large retry counts cannot overflow the
    /// floating-point math; the cap is far beyond any delay the max timeout
    /// would allow through anyway.
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let exponent = retry.min(20) as i32;
        let base = self.min_timeout.as_millis() as f64 * self.factor.powi(exponent);
        let capped = base.min(self.max_timeout.as_millis() as f64);

        let final_ms = if self.jitter {
            let mut rng = rand::thread_rng();
            capped * rng.gen_range(0.5..1.0)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }
}

/// Decides whether a failed invocation is worth re-running.
pub trait RetryClassifier: Send + Sync {
    fn is_retryable(&self, error: &VigilError) -> bool;
}

/// Classifier for DNS probe attempts: every resolver failure is transient.
/// The probe bounds upstream pressure with its attempt counter, not here.
#[derive(Debug, Clone, Default)]
pub struct DnsRetryClassifier;

impl RetryClassifier for DnsRetryClassifier {
    fn is_retryable(&self, _error: &VigilError) -> bool {
        true
    }
}

/// Classifier for WHOIS lookups.
///
/// A bailed query (`WhoisQuery`) and TLD-extraction failure are definitive
/// non-answers; configuration and input errors cannot improve on retry.
/// Everything else (socket failures, timeouts, garbled responses) retries.
#[derive(Debug, Clone, Default)]
pub struct WhoisRetryClassifier;

impl RetryClassifier for WhoisRetryClassifier {
    fn is_retryable(&self, error: &VigilError) -> bool {
        !matches!(
            error,
            VigilError::WhoisQuery { .. }
                | VigilError::TldExtraction(_)
                | VigilError::InvalidDomain(_)
                | VigilError::InvalidServerSpec(_)
                | VigilError::Config(_)
        )
    }
}

/// Runs async operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor<C: RetryClassifier> {
    policy: RetryPolicy,
    classifier: C,
}

impl<C: RetryClassifier> RetryExecutor<C> {
    pub fn new(policy: RetryPolicy, classifier: C) -> Self {
        Self { policy, classifier }
    }

    /// Invokes `operation` until it succeeds, fails with a non-retryable
    /// error, or exhausts the retry budget.
    ///
    /// A non-retryable error is returned as-is, even mid-schedule, so callers
    /// can still match on its variant. Exhaustion of a retryable error is
    /// wrapped in [`VigilError::RetryExhausted`].
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_invocations = self.policy.retries + 1;

        for invocation in 0..max_invocations {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !self.classifier.is_retryable(&e) => return Err(e),
                Err(e) if invocation + 1 == max_invocations => {
                    warn!(
                        attempts = max_invocations,
                        error = %e,
                        "operation failed after retries"
                    );
                    return Err(VigilError::RetryExhausted {
                        attempts: max_invocations,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_for_retry(invocation);
                    debug!(
                        invocation = invocation + 1,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop returns on the final invocation")
    }
}
