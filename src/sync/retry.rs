use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::utils::error::Result;

/// Growth of the delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base × attempt`
    Linear,
    /// `base × 2^(attempt-1)`
    Exponential,
}

/// How often and how patiently to retry retryable errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn linear(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay, backoff: Backoff::Linear }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay, backoff: Backoff::Exponential }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(retry),
            Backoff::Exponential => self.base_delay.saturating_mul(1u32 << (retry - 1).min(16)),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. `op` receives the 0-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt,
                    policy.max_retries + 1,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delays() {
        let linear = RetryPolicy::linear(3, Duration::from_secs(2));
        assert_eq!(linear.delay_for(1), Duration::from_secs(2));
        assert_eq!(linear.delay_for(2), Duration::from_secs(4));
        assert_eq!(linear.delay_for(3), Duration::from_secs(6));

        let exp = RetryPolicy::exponential(3, Duration::from_secs(1));
        assert_eq!(exp.delay_for(1), Duration::from_secs(1));
        assert_eq!(exp.delay_for(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retries_network_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::from_millis(1));
        let result = retry(&policy, "fetch", |_| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::Network("connection reset".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::from_millis(1));
        let result: Result<()> = retry(&policy, "fetch", |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Timeout(Duration::from_secs(30)))
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::from_millis(1));
        let result: Result<()> = retry(&policy, "fetch", |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Network("unreachable".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
