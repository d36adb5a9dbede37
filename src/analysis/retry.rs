// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Exponential backoff with jitter
//!
//! The policy knows nothing about HTTP; callers pass a classifier that says
//! which errors are worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Backoff schedule for a fallible async operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first; 0 behaves as 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Scale each delay into `[delay/2, delay]`
    pub jitter: bool,
}

/// The last error once retries stop, with how many calls were made
#[derive(Debug)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
}

impl RetryPolicy {
    /// A policy that makes a single call
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` (1-based), before jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    fn sleep_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if self.jitter {
            jittered(delay, unit_random())
        } else {
            delay
        }
    }

    /// Call `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, C>(&self, mut op: F, is_retryable: C) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: Display,
    {
        let max = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= max || !is_retryable(&error) {
                        return Err(RetryError { error, attempts: attempt });
                    }
                    let delay = self.sleep_for(attempt);
                    warn!(attempt = attempt, max_attempts = max, wait_ms = delay.as_millis() as u64, error = %error, "request failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Map `fraction` in `[0, 1]` onto `[delay/2, delay]`
fn jittered(delay: Duration, fraction: f64) -> Duration {
    let fraction = fraction.clamp(0.0, 1.0);
    delay.mul_f64(0.5 + 0.5 * fraction)
}

/// Uniform value in `[0, 1]` from the random bits of a v4 UUID
fn unit_random() -> f64 {
    let bits = (Uuid::new_v4().as_u128() >> 64) as u64;
    bits as f64 / u64::MAX as f64
}
