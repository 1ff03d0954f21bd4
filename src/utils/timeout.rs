//! Optional deadlines around the suspension points of a call.
//!
//! The baseline protocol waits indefinitely; a `Some(limit)` turns the wait
//! into a bounded one that fails with [`RpcError::Timeout`].

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, RpcError};

/// Await `fut`, giving up after `limit` when one is set
pub async fn with_optional_timeout<F, T>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RpcError::Timeout)?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_wait_completes() {
        let value = with_optional_timeout(None, async { Ok::<_, RpcError>(7) }).await;
        assert_eq!(value.expect("completes"), 7);
    }

    #[tokio::test]
    async fn bounded_wait_times_out() {
        let result = with_optional_timeout(Some(Duration::from_millis(20)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, RpcError>(())
        })
        .await;
        assert!(matches!(result, Err(RpcError::Timeout)));
    }
}
