//! Bounded retry with backoff.

use std::future::Future;

use contracts::{ContractError, RetryConfig};
use observability::record_retry_attempt;
use tracing::{debug, warn};

/// Run `op` until it succeeds or `config.max_attempts` is reached
///
/// `op` receives the 1-based attempt number. On exhaustion the last error is
/// wrapped in [`ContractError::RetryExhausted`].
pub async fn retry<T, F, Fut>(
    operation: &str,
    config: &RetryConfig,
    mut op: F,
) -> Result<T, ContractError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ContractError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                record_retry_attempt(operation);

                if attempt >= max_attempts {
                    warn!(operation, attempts = attempt, error = %err, "retries exhausted");
                    return Err(ContractError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last_error: Box::new(err),
                    });
                }

                let delay = config.backoff.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Backoff;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config(max_attempts: u32, backoff: Backoff) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff,
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let calls = AtomicU32::new(0);
        let value = retry("op", &config(3, Backoff::None), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ContractError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let value = retry("op", &config(3, Backoff::None), |attempt| async move {
            if attempt < 3 {
                Err(ContractError::transport("flaky"))
            } else {
                Ok(attempt)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_error() {
        let err = retry("create directory entry", &config(2, Backoff::None), |attempt| async move {
            Err::<(), _>(ContractError::transport(format!("boom {attempt}")))
        })
        .await
        .unwrap_err();

        match err {
            ContractError::RetryExhausted {
                operation,
                attempts,
                last_error,
            } => {
                assert_eq!(operation, "create directory entry");
                assert_eq!(attempts, 2);
                assert!(last_error.to_string().contains("boom 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result = retry("op", &config(0, Backoff::None), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ContractError::transport("down"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let started = tokio::time::Instant::now();
        let backoff = Backoff::Exponential {
            base_ms: 100,
            max_ms: 1_000,
        };
        let _ = retry("op", &config(3, backoff), |_| async {
            Err::<(), _>(ContractError::transport("down"))
        })
        .await;
        // 100ms after the first failure, 200ms after the second
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
