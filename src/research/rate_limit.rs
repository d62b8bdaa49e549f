//! Sliding-window throttle for outbound provider calls.
//!
//! Callers suspend until a request slot is free; being throttled is added
//! latency, never an error. An optional deadline turns an unbounded wait
//! into a typed timeout.

use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, instrument};

/// Returned by [`SlidingWindowLimiter::acquire_before`] when the window is
/// saturated past the caller's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit wait would exceed the caller's deadline")]
pub struct ThrottleTimeout;

/// Outcome of a single admission attempt.
enum Admission {
    Granted,
    /// Window full; the oldest tracked request leaves the window at this
    /// instant.
    RetryAt(Instant),
}

/// Bounds outbound call rate to `max_requests` per rolling `window`.
///
/// The timestamp window is a single shared resource guarded by a mutex;
/// pruning, the quota check and the admission record happen under one lock
/// so two concurrent callers can never both take the last slot.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `max_requests` per `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Suspend until a request slot is available, then take it.
    ///
    /// Never fails; a persistently saturated window means an unbounded wait.
    /// Use [`SlidingWindowLimiter::acquire_before`] when latency must be
    /// bounded.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        loop {
            match self.try_admit().await {
                Admission::Granted => return,
                Admission::RetryAt(at) => {
                    debug!("window saturated, waiting for a slot");
                    sleep_until(at).await;
                }
            }
        }
    }

    /// Like [`SlidingWindowLimiter::acquire`], but give up once the next
    /// possible admission lies beyond `deadline`.
    #[instrument(skip(self))]
    pub async fn acquire_before(&self, deadline: Instant) -> Result<(), ThrottleTimeout> {
        loop {
            match self.try_admit().await {
                Admission::Granted => return Ok(()),
                Admission::RetryAt(at) => {
                    if at > deadline {
                        return Err(ThrottleTimeout);
                    }
                    sleep_until(at).await;
                }
            }
        }
    }

    /// Prune aged-out timestamps, then either record an admission or report
    /// when the next slot frees up. One lock covers the whole step.
    async fn try_admit(&self) -> Admission {
        let mut window = self.timestamps.lock().await;
        let now = Instant::now();

        while window
            .front()
            .map_or(false, |oldest| now.duration_since(*oldest) >= self.window)
        {
            window.pop_front();
        }

        if window.len() < self.max_requests {
            window.push_back(now);
            Admission::Granted
        } else {
            // Non-empty here: max_requests is at least one.
            let oldest = window.front().copied().unwrap_or(now);
            Admission::RetryAt(oldest + self.window)
        }
    }

    /// Requests currently tracked inside the window.
    pub async fn in_flight(&self) -> usize {
        let window = self.timestamps.lock().await;
        let now = Instant::now();
        window
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }

    /// Configured window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Configured admission limit per window.
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_calls_under_quota_are_immediate() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_millis(1000));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_quota_waits_for_window() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(1000));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Third call must wait until the first timestamp ages out.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_free_as_timestamps_age_out() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(1000));

        limiter.acquire().await;
        limiter.acquire().await;

        advance(Duration::from_millis(1100)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_over_admission_under_concurrency() {
        let limiter = Arc::new(SlidingWindowLimiter::new(5, Duration::from_millis(1000)));
        let immediate = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            let immediate = immediate.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                if start.elapsed() == Duration::ZERO {
                    immediate.fetch_add(1, Ordering::SeqCst);
                }
                start.elapsed()
            }));
        }

        let mut waited = 0;
        for handle in handles {
            let elapsed = handle.await.expect("task panicked");
            if elapsed >= Duration::from_millis(1000) {
                waited += 1;
            }
        }

        // Exactly the quota proceeds immediately; the rest queue for a
        // full window.
        assert_eq!(immediate.load(Ordering::SeqCst), 5);
        assert_eq!(waited, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_short_circuits_saturated_window() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(1000));
        limiter.acquire().await;

        let deadline = Instant::now() + Duration::from_millis(100);
        assert_eq!(limiter.acquire_before(deadline).await, Err(ThrottleTimeout));

        // A deadline past the window succeeds after waiting.
        let generous = Instant::now() + Duration::from_millis(2000);
        let start = Instant::now();
        assert!(limiter.acquire_before(generous).await.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_with_free_slot_is_immediate() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(1000));
        let deadline = Instant::now() + Duration::from_millis(10);
        assert!(limiter.acquire_before(deadline).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_is_clamped_to_one() {
        let limiter = SlidingWindowLimiter::new(0, Duration::from_millis(100));
        assert_eq!(limiter.max_requests(), 1);
        limiter.acquire().await;
    }
}
