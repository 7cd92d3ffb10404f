//! Sleep abstraction so retry backoff and the cycle pause can be observed
//! in tests without real delays.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Largest backoff exponent; later attempts reuse `2^16` seconds.
pub const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay before retrying after the 0-indexed `attempt` failed: `2^attempt`
/// seconds, clamped at [`MAX_BACKOFF_EXPONENT`].
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXPONENT))
}
