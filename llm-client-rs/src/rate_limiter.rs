// llm-client-rs/src/rate_limiter.rs
// Sliding-window admission control shared by all outbound LLM calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

// Extra sleep after the oldest timestamp expires, so a wake-up on the
// exact boundary cannot re-observe a full window.
const SAFETY_MARGIN: Duration = Duration::from_millis(100);

/// Sliding-window rate limiter: at most `max_calls` admissions within any
/// trailing `window`. Admission can only delay, never fail. Shared across
/// backends of one engine instance; the call history is instance-lifetime
/// state cleared only by `reset()`.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `max_calls` is clamped to at least 1; a zero-capacity window would
    /// make `admit` block forever, which the delay-only contract forbids.
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until one more call fits in the window, then record it.
    pub async fn admit(&self) {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();
        Self::prune(&mut calls, now, self.window);

        if calls.len() >= self.max_calls {
            // Sleep until the oldest recorded call ages out of the window.
            let oldest = *calls.front().expect("non-empty at capacity");
            let wait = (oldest + self.window).saturating_duration_since(now) + SAFETY_MARGIN;
            log::info!(
                "rate limit reached ({} calls/{:?}), waiting {:?}",
                self.max_calls,
                self.window,
                wait
            );
            tokio::time::sleep(wait).await;
            Self::prune(&mut calls, Instant::now(), self.window);
        }

        calls.push_back(Instant::now());
    }

    /// Advisory: admissions currently available without waiting.
    pub async fn remaining_calls(&self) -> usize {
        let mut calls = self.calls.lock().await;
        Self::prune(&mut calls, Instant::now(), self.window);
        self.max_calls.saturating_sub(calls.len())
    }

    /// Advisory: how long the next admission would block. Zero when a
    /// slot is free.
    pub async fn wait_time(&self) -> Duration {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();
        Self::prune(&mut calls, now, self.window);

        if calls.len() < self.max_calls {
            return Duration::ZERO;
        }
        let oldest = *calls.front().expect("non-empty at capacity");
        (oldest + self.window).saturating_duration_since(now)
    }

    /// Clear all recorded call history.
    pub async fn reset(&self) {
        self.calls.lock().await.clear();
    }

    fn prune(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = calls.front() {
            if now.duration_since(*front) > window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
