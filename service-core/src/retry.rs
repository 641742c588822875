//! Bounded retry for writes that can lose a uniqueness race.
//!
//! A caller that derives a unique value from a snapshot (scan, then insert)
//! maps the store's unique violation to [`AppError::Conflict`]. This module
//! reruns the whole operation, including the scan, with exponential backoff,
//! and turns an exhausted budget into [`AppError::TransientConflict`].

use crate::error::AppError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Initial backoff duration before first retry.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to backoff duration.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the specified max retries.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a config with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = backoff.min(self.max_backoff.as_millis() as f64) as u64;

        let mut duration = Duration::from_millis(backoff_ms);

        if self.add_jitter {
            // Up to 25% jitter so colliding writers spread out.
            let jitter = rand::thread_rng().gen_range(0..=backoff_ms / 4);
            duration += Duration::from_millis(jitter);
        }

        duration
    }
}

/// Only uniqueness conflicts are worth rerunning; everything else is final.
pub fn is_retryable(err: &AppError) -> bool {
    matches!(err, AppError::Conflict(_))
}

/// Run `f` until it succeeds, fails with a non-retryable error, or the retry
/// budget is spent.
///
/// # Example
/// ```ignore
/// let invoice = retry_on_conflict(&RetryConfig::default(), "create_invoice", || async {
///     db.try_create_invoice(&input, year).await
/// })
/// .await?;
/// ```
pub async fn retry_on_conflict<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    f: F,
) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(AppError::Conflict(last_error)) if attempt >= config.max_retries => {
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %last_error,
                    "Conflict persisted after max retries"
                );
                return Err(AppError::TransientConflict {
                    attempts: attempt + 1,
                    last_error,
                });
            }
            Err(err) => {
                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    "Conflict detected, retrying after backoff"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    #[test]
    fn test_backoff_duration() {
        let config = RetryConfig {
            add_jitter: false,
            max_backoff: Duration::from_secs(10),
            ..Default::default()
        };

        assert_eq!(config.backoff_duration(0), Duration::from_millis(20));
        assert_eq!(config.backoff_duration(1), Duration::from_millis(40));
        assert_eq!(config.backoff_duration(2), Duration::from_millis(80));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            add_jitter: false,
            ..Default::default()
        };
        assert_eq!(config.backoff_duration(10), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_within_a_quarter() {
        let config = RetryConfig {
            max_backoff: Duration::from_secs(10),
            ..Default::default()
        };

        for _ in 0..50 {
            let duration = config.backoff_duration(2);
            assert!(duration >= Duration::from_millis(80));
            assert!(duration <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(&AppError::Conflict(anyhow::anyhow!("dup"))));
        assert!(!is_retryable(&AppError::NotFound(anyhow::anyhow!("gone"))));
        assert!(!is_retryable(&AppError::DatabaseError(anyhow::anyhow!(
            "down"
        ))));
    }

    #[tokio::test]
    async fn test_retry_success_after_conflicts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_on_conflict(&fast(3), "test_op", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::Conflict(anyhow::anyhow!("taken")))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_transient_conflict() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_on_conflict(&fast(2), "test_op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Conflict(anyhow::anyhow!("taken")))
        })
        .await;

        match result {
            Err(AppError::TransientConflict { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_on_conflict(&fast(5), "test_op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::BadRequest(anyhow::anyhow!("bad")))
        })
        .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_surfaces_first_conflict() {
        let result: Result<(), _> = retry_on_conflict(&RetryConfig::no_retry(), "test_op", || async {
            Err(AppError::Conflict(anyhow::anyhow!("taken")))
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::TransientConflict { attempts: 1, .. })
        ));
    }
}
