// src/probe/mod.rs
//! Socket work for one query attempt.

pub mod bedrock;
pub mod java;

use crate::error::Result;
use crate::types::McQueryError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation shared by every step of one attempt.
#[derive(Debug, Clone)]
pub struct AttemptScope {
    deadline: Option<Instant>,
    cancel: CancellationToken,
    host: String,
    port: u16,
}

impl AttemptScope {
    /// A zero `timeout` leaves the attempt bounded only by `cancel`.
    pub fn new(timeout: Duration, cancel: CancellationToken, host: &str, port: u16) -> Self {
        let deadline = if timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + timeout)
        };
        Self {
            deadline,
            cancel,
            host: host.to_string(),
            port,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout_error(&self) -> McQueryError {
        McQueryError::TimeoutError {
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// Runs one suspension point under the attempt deadline.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(McQueryError::Cancelled),
            result = fut => result,
            _ = deadline => Err(self.timeout_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_times_out() {
        let scope = AttemptScope::new(Duration::from_millis(20), CancellationToken::new(), "example.com", 25565);
        let err = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, McQueryError::TimeoutError { port: 25565, .. }));
        assert_eq!(err.to_string(), "Timeout while querying example.com:25565");
    }

    #[tokio::test]
    async fn test_scope_observes_cancellation() {
        let cancel = CancellationToken::new();
        let scope = AttemptScope::new(Duration::ZERO, cancel.clone(), "example.com", 19132);
        cancel.cancel();
        let err = scope.run(std::future::pending::<Result<()>>()).await.unwrap_err();
        assert!(matches!(err, McQueryError::Cancelled));
    }

    #[tokio::test]
    async fn test_scope_passes_result_through() {
        let scope = AttemptScope::new(Duration::from_secs(1), CancellationToken::new(), "h", 1);
        assert_eq!(scope.run(async { Ok(7) }).await.unwrap(), 7);
    }
}
