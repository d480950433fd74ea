//! Exponential-backoff retry wrapper for fallible async operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no sleeping. Used by callers that must fail fast.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` attempts are
/// spent, doubling the sleep between attempts. Returns the last error on
/// exhaustion.
pub async fn with_exponential_backoff<T, E, F, Fut>(
    mut operation: F,
    operation_name: &str,
    policy: RetryPolicy,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        "Successfully completed {} after {} attempts",
                        operation_name,
                        attempt + 1
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts.max(1) {
                    error!(
                        "Failed to {} after {} attempts: {}",
                        operation_name, attempt, err
                    );
                    return Err(err);
                }
                warn!(
                    "{} attempt {} failed: {}. Retrying in {:?}...",
                    operation_name, attempt, err, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_exhaustion_attempts_exactly_max() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_exponential_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("always fails".to_string())
            },
            "doomed operation",
            fast_policy(5),
        )
        .await;

        assert_eq!(result.unwrap_err(), "always fails");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_exponential_backoff(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("not yet".to_string())
                } else {
                    Ok(n)
                }
            },
            "flaky operation",
            fast_policy(5),
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_exponential_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("no".to_string())
            },
            "one shot",
            RetryPolicy::once(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
