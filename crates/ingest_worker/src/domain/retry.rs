use common::domain::DomainResult;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Step-level retry policy for store calls.
///
/// Only transient failures (store unavailable, timeout) are retried;
/// permanent errors are returned immediately. Backoff doubles per attempt up
/// to `max_delay`. Waiting between attempts is abandoned on shutdown so a
/// cancelled worker does not sit in a backoff sleep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Run `operation` until it succeeds, fails permanently, or exhausts
    /// `max_attempts`. Returns the last error on give-up.
    pub async fn run<T, F, Fut>(&self, shutdown: &CancellationToken, operation: F) -> DomainResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() || attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "store call failed, retrying"
                    );

                    tokio::select! {
                        _ = shutdown.cancelled() => return Err(e),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::DomainError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let shutdown = CancellationToken::new();

        let result = fast_policy()
            .run(&shutdown, move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(DomainError::StoreUnavailable(anyhow::anyhow!("down")))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let shutdown = CancellationToken::new();

        let result: DomainResult<()> = fast_policy()
            .run(&shutdown, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DomainError::StoreUnavailable(anyhow::anyhow!("down")))
                }
            })
            .await;

        assert!(matches!(result, Err(DomainError::StoreUnavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let shutdown = CancellationToken::new();

        let result: DomainResult<()> = fast_policy()
            .run(&shutdown, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DomainError::DecodeError("bad json".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(DomainError::DecodeError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_backoff() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
        };

        let result: DomainResult<()> = policy
            .run(&shutdown, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DomainError::StoreUnavailable(anyhow::anyhow!("down")))
                }
            })
            .await;

        assert!(matches!(result, Err(DomainError::StoreUnavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
