use std::time::Duration;

/// Delay to wait after a failed lock attempt, as a function of the attempt index
/// (0 for the first retry).
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// `min(base * 2^attempt, cap)` plus a uniform jitter in `0..=jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialJitter {
    pub base: Duration,
    pub jitter: Duration,
    pub cap: Duration,
}

impl Default for ExponentialJitter {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            jitter: Duration::from_millis(100),
            cap: Duration::from_secs(5),
        }
    }
}

impl Backoff for ExponentialJitter {
    fn delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.cap);
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(0..=jitter_ms))
        };
        exponential + jitter
    }
}

/// Retry immediately. Meant for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDelay;

impl Backoff for NoDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}
