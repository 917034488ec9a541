//! Reconnect backoff

use std::time::Duration;

/// Exponential backoff without jitter.
///
/// The n-th consecutive delay is `min(base * 2^n, cap)`; a successful
/// connection resets `n` to zero.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempts: 0,
        }
    }

    /// Delay for the current attempt count, without advancing it
    pub fn peek(&self) -> Duration {
        delay_for(self.base, self.cap, self.attempts)
    }

    /// Delay for the next reconnect; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.peek();
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

fn delay_for(base: Duration, cap: Duration, attempts: u32) -> Duration {
    let factor = 1u32.checked_shl(attempts).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(cap, |d| d.min(cap))
}
