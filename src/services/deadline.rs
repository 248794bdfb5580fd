//! Bounded storage round trips.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A storage call that failed or ran out of time. Both are worth retrying
/// later, so callers surface them as transient.
#[derive(Debug, Error)]
pub enum StorageFailure {
    #[error("storage operation `{operation}` timed out after {timeout:?}")]
    TimedOut {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("storage operation `{operation}` failed: {message}")]
    Failed {
        operation: &'static str,
        message: String,
    },
}

pub async fn bounded<T, F>(
    timeout: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, StorageFailure>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(operation, error = format!("{e:#}"), "Storage operation failed");
            metrics::counter!("storage_failures_total", "kind" => "error").increment(1);
            Err(StorageFailure::Failed {
                operation,
                message: format!("{e:#}"),
            })
        }
        Err(_) => {
            tracing::warn!(operation, ?timeout, "Storage operation timed out");
            metrics::counter!("storage_failures_total", "kind" => "timeout").increment(1);
            Err(StorageFailure::TimedOut { operation, timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_value_through() {
        let value = bounded(Duration::from_secs(1), "noop", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_error_is_failed() {
        let result: Result<(), _> = bounded(Duration::from_secs(1), "broken", async {
            Err(anyhow::anyhow!("disk I/O error"))
        })
        .await;
        assert!(matches!(result, Err(StorageFailure::Failed { .. })));
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let result: Result<(), _> = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StorageFailure::TimedOut { .. })));
    }
}
