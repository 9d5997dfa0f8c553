//! Retry logic with exponential backoff for upstream API calls

use crate::config::StockConfig;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Derive the policy from the stock configuration
    pub fn from_config(config: &StockConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: config.retry_backoff_base,
            ..Self::default()
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based), doubling each time
    fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(retry - 1);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// Only transient errors (network failures, timeouts) are retried.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(operation = operation_name, attempt, max = self.max_attempts, "Calling upstream");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.backoff_duration(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %e,
                        ?backoff,
                        "Transient failure, retrying"
                    );
                    sleep(backoff).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(operation = operation_name, attempts = attempt, error = %e, "Giving up");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StockError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn timeout_error(operation: &str) -> StockError {
        StockError::Timeout {
            operation: operation.to_string(),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let config = StockConfig::builder()
            .max_retries(5)
            .retry_backoff_base(Duration::from_millis(200))
            .build()
            .unwrap();
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(200));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(0), Duration::ZERO);
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_duration(10), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = RetryPolicy::default()
            .execute("quote", || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(timeout_error("quote"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = RetryPolicy::default()
            .execute("search", || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StockError::InvalidSymbol("??".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(StockError::InvalidSymbol(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_run_out() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = RetryPolicy::default()
            .execute("overview", || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(timeout_error("overview"))
                }
            })
            .await;

        assert!(matches!(result, Err(StockError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }
}
