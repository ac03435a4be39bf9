//! Reconnect backoff

use rand::Rng;
use std::time::Duration;

/// Grows by `factor` per failure; once past `ceiling` it stays there plus random jitter
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    factor: f64,
    ceiling: Duration,
    jitter: Duration,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(floor: Duration, factor: f64, ceiling: Duration, jitter: Duration) -> Self {
        Self {
            floor,
            factor: factor.max(1.0),
            ceiling: ceiling.max(floor),
            jitter,
            current: floor,
            attempts: 0,
        }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempts = self.attempts.saturating_add(1);

        let grown = self.current.mul_f64(self.factor);
        self.current = if grown > self.ceiling {
            let jitter = self.jitter.mul_f64(rand::thread_rng().gen_range(0.0..=1.0));
            self.ceiling + jitter
        } else {
            grown
        };

        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
        self.attempts = 0;
    }

    /// Consecutive failures since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(1),
            1.5,
            Duration::from_secs(115),
            Duration::from_secs(10),
        )
    }
}
