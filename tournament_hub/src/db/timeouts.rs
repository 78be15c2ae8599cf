//! Database query timeout helpers
//!
//! Provides timeout wrappers for database operations to prevent indefinite hangs.

use std::time::Duration;
use tokio::time::timeout;

use super::errors::{StoreError, StoreResult};

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for multi-statement transactions (30 seconds)
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a query with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `StoreResult<T>` - Result or timeout error
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, sqlx::Error>(1)
        };
        let err = with_timeout(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_store_errors_pass_through_unchanged() {
        let failing = async { Err::<(), _>(StoreError::Conflict("taken".to_string())) };
        let err = with_timeout(LONG_OPERATION_TIMEOUT, failing).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(msg) if msg == "taken"));
    }

    #[tokio::test]
    async fn test_fast_future_passes_through() {
        let value = with_default_timeout(async { Ok::<_, sqlx::Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
