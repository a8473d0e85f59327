use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::Rng;

/// Spaces out page loads so the remote site isn't hammered.
///
/// One pacer is shared by every city of a run, so concurrent workers still
/// look like a single polite client. Fixed spacing plus random jitter, no
/// adaptive backoff.
pub struct PagePacer {
    // None when the configured spacing is zero.
    spacing: Option<DefaultDirectRateLimiter>,
    jitter: Duration,
}

impl PagePacer {
    pub fn new(page_delay: Duration, jitter: Duration) -> Self {
        let spacing = Quota::with_period(page_delay).map(RateLimiter::direct);
        Self { spacing, jitter }
    }

    /// Wait (non-blocking) until another page load is allowed.
    pub async fn pause(&self) {
        if let Some(limiter) = &self.spacing {
            limiter.until_ready().await;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms > 0 {
            let extra = rand::thread_rng().gen_range(0..=jitter_ms);
            tokio::time::sleep(Duration::from_millis(extra)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn first_pause_is_immediate_then_spaced() {
        let pacer = PagePacer::new(Duration::from_millis(80), Duration::ZERO);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() < Duration::from_millis(50));
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn zero_delay_never_waits() {
        let pacer = PagePacer::new(Duration::ZERO, Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.pause().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
