//! Timeout envelope for generation stages
//!
//! Races an operation against a deadline. The deadline only bounds how long
//! we wait: the losing operation is dropped, but whatever the browser was doing
//! on its behalf keeps running until the session is torn down.

use std::future::Future;
use std::time::{Duration, Instant};

use super::errors::{GenerateError, GenerateResult};

/// Wrap an async operation with an explicit deadline
///
/// # Arguments
/// * `operation` - The future to run
/// * `duration` - Deadline measured from the first poll
/// * `label` - Human-readable name used in the timeout error
///
/// # Returns
/// * `Ok(T)` - Operation completed in time
/// * `Err(GenerateError::Timeout)` - The deadline fired first
/// * `Err(_)` - The operation itself failed
pub async fn with_timeout<F, T>(operation: F, duration: Duration, label: &str) -> GenerateResult<T>
where
    F: Future<Output = GenerateResult<T>>,
{
    let started = Instant::now();

    // tokio::time::timeout owns its timer; it is dropped as soon as either side settles
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(GenerateError::Timeout {
            label: label.to_string(),
            duration,
            elapsed: started.elapsed(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operation_finishing_first_wins() {
        let result = with_timeout(async { Ok(42) }, Duration::from_secs(1), "fast").await;
        assert_eq!(result.expect("Operation should finish before deadline"), 42);
    }

    #[tokio::test]
    async fn test_never_settling_operation_times_out() {
        let started = Instant::now();
        let result: GenerateResult<()> = with_timeout(
            futures::future::pending(),
            Duration::from_millis(50),
            "stuck collector",
        )
        .await;

        match result {
            Err(GenerateError::Timeout {
                label, duration, ..
            }) => {
                assert_eq!(label, "stuck collector");
                assert_eq!(duration, Duration::from_millis(50));
            }
            other => panic!("Expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_operation_error_is_not_a_timeout() {
        let result: GenerateResult<()> = with_timeout(
            async { Err(GenerateError::Config("bad".to_string())) },
            Duration::from_secs(1),
            "failing",
        )
        .await;
        assert!(matches!(result, Err(GenerateError::Config(_))));
    }

    #[tokio::test]
    async fn test_inner_timeout_leaves_outer_envelope_running() {
        let outer = with_timeout(
            async {
                let inner: GenerateResult<()> = with_timeout(
                    futures::future::pending(),
                    Duration::from_millis(20),
                    "inner",
                )
                .await;
                assert!(inner.as_ref().is_err_and(GenerateError::is_timeout));
                Ok("outer finished")
            },
            Duration::from_millis(500),
            "outer",
        )
        .await;

        assert_eq!(outer.expect("Outer envelope should not fire"), "outer finished");
    }
}
