// src/limiter.rs
//! Shared token bucket (capacity 1) pacing outbound publish attempts.

use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("rate limiter wait cancelled")]
    Cancelled,
}

/// Gate that lets one caller through per `interval`.
/// - First acquisition is immediate (bucket starts full).
/// - Later callers queue behind already handed-out slots.
/// - A cancelled waiter hands its slot back if nobody queued behind it.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `Duration::ZERO` disables pacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until a token is available or `cancel` fires.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), LimiterError> {
        if cancel.is_cancelled() {
            return Err(LimiterError::Cancelled);
        }

        let slot = self.reserve();
        if slot <= Instant::now() {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.release(slot);
                tracing::debug!(target: "limiter", "wait cancelled");
                Err(LimiterError::Cancelled)
            }
            _ = tokio::time::sleep_until(slot) => Ok(()),
        }
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = self.next_slot.lock().unwrap_or_else(|p| p.into_inner());
        let slot = match *next {
            Some(n) if n > now => n,
            _ => now,
        };
        *next = Some(slot + self.interval);
        slot
    }

    fn release(&self, slot: Instant) {
        let mut next = self.next_slot.lock().unwrap_or_else(|p| p.into_inner());
        if *next == Some(slot + self.interval) {
            *next = Some(slot);
        }
    }
}
