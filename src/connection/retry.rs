//! Bounded exponential backoff for room gateway calls.
//!
//! The delay before retry `n` (1-indexed) is `base_delay * 2^(n-1)`, so three
//! attempts with a 5 s base wait 5 s and then 10 s. Every gateway failure is
//! retried, whatever its status; errors outside the gateway (see
//! [`crate::error::EchoError::is_retryable`]) are returned immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::Result;

/// Retry settings for a single gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay slept before retry `retry` (1-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// # Arguments
    /// * `operation` - Name used in log lines
    /// * `call` - Produces a fresh future for every attempt
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        transient = err.is_transient(),
                        error = %err,
                        "Gateway call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EchoError, GatewayError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn transient() -> EchoError {
        GatewayError::status(503, "unavailable").into()
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed_sleeps_d_then_2d() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let start = Instant::now();
        let calls = Mutex::new(Vec::new());

        let result = policy
            .run("list_rooms", || {
                let mut log = calls.lock().unwrap();
                log.push(start.elapsed());
                let n = log.len();
                async move {
                    if n < 3 {
                        Err(transient())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        let log = calls.lock().unwrap();
        assert_eq!(log[0], Duration::ZERO);
        assert_eq!(log[1], Duration::from_secs(5));
        assert_eq!(log[2], Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("history", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(matches!(result, Err(EchoError::Gateway(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_status_errors_are_retried() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = policy
            .run("get_room_history", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(GatewayError::status(404, "not found").into())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_errors_are_retried() {
        let policy = RetryPolicy::new(2, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("list_rooms", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Decode("expected value".into()).into()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(EchoError::Gateway(GatewayError::Decode(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_gateway_error_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = policy
            .run("watch_room", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(EchoError::RoomNotFound("general".into())) }
            })
            .await;

        assert!(matches!(result, Err(EchoError::RoomNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
