//! Bounded retry with exponential backoff for remote calls
//!
//! Only [`RemoteErrorKind::Transient`] failures are retried; everything else
//! returns immediately so quota exhaustion and hard failures surface to the
//! caller after a single attempt.

use crate::clients::RemoteError;
use std::future::Future;
use std::time::Duration;

/// Retry bounds for remote calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubled per attempt
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

/// Run a remote operation, retrying transient failures with exponential
/// backoff up to the policy bound.
///
/// Non-transient errors (quota exhaustion, not-found, client errors) are
/// returned immediately without a retry.
pub async fn retry_remote<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Remote call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient remote error, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => {
                if err.is_retryable() {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Remote call failed: retry bound exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RemoteErrorKind;
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let mut calls = 0;
        let result = retry_remote("test_op", &fast_policy(), || {
            calls += 1;
            async move { Ok::<i32, RemoteError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_transient_retried_within_bound() {
        // 503 twice, success on the third attempt
        let mut calls = 0;
        let start = Instant::now();

        let result = retry_remote("test_op", &fast_policy(), || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(RemoteError::from_status(503, "unavailable"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
        // backoff slept 10ms then 20ms
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_quota_not_retried() {
        let mut calls = 0;
        let result: Result<i32, _> = retry_remote("test_op", &fast_policy(), || {
            calls += 1;
            async move { Err(RemoteError::from_status(403, "quota exceeded")) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::QuotaExceeded);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_other_error_not_retried() {
        let mut calls = 0;
        let result: Result<i32, _> = retry_remote("test_op", &fast_policy(), || {
            calls += 1;
            async move { Err(RemoteError::from_status(400, "bad request")) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, RemoteErrorKind::Other);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retry_bound_exhausted() {
        let mut calls = 0;
        let result: Result<i32, _> = retry_remote("test_op", &fast_policy(), || {
            calls += 1;
            async move { Err(RemoteError::from_status(500, "boom")) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, RemoteErrorKind::Transient);
        assert_eq!(calls, 3);
    }
}
