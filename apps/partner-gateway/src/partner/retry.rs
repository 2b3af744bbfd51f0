//! Retry policy with exponential backoff for partner API calls.
//!
//! # Retryable Errors
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 429 (Rate Limited) | HTTP 400 (Bad Request) |
//! | HTTP 5xx (Server Error) | HTTP 401/403 (handled by token refresh) |
//! | | Client-side timeout (fail fast) |
//! | | Connection-level failures (fail fast) |

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;

use crate::config::RetrySettings;

/// Category of an upstream HTTP status for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - prefer the Retry-After header.
    RateLimited,
    /// Transient server failure, retryable with backoff.
    Retryable,
    /// Permanent failure, never retried.
    NonRetryable,
}

/// Categorize an HTTP status code for retry handling.
#[must_use]
pub const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        500..=599 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Parse a Retry-After header value (seconds form only).
///
/// The HTTP-date form is not produced by the partner API.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Exponential backoff calculator with additive jitter.
///
/// Produces `initial * multiplier^attempt + rand(0..=jitter)`, capped at the
/// configured maximum. Returns `None` once attempts are exhausted.
#[derive(Debug)]
pub struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: Duration,
}

impl ExponentialBackoff {
    /// Create a new backoff calculator from retry settings.
    #[must_use]
    pub const fn new(settings: &RetrySettings) -> Self {
        Self {
            attempt: 0,
            max_attempts: settings.max_attempts,
            initial: settings.initial_backoff,
            max: settings.max_backoff,
            multiplier: settings.multiplier,
            jitter: settings.jitter,
        }
    }

    /// Get the next backoff duration, or `None` if attempts are exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }

        let base = self.initial.as_secs_f64() * self.multiplier.powi(self.attempt as i32);
        let capped = base.min(self.max.as_secs_f64());
        self.attempt += 1;

        Some(Duration::from_secs_f64(capped) + self.random_jitter())
    }

    /// Prefer an upstream Retry-After hint over the computed backoff.
    ///
    /// The attempt counter still advances, so a hint does not grant extra
    /// retries.
    pub fn next_backoff_with_hint(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        match retry_after {
            Some(hint) => {
                if self.attempt >= self.max_attempts {
                    return None;
                }
                self.attempt += 1;
                Some(hint + self.random_jitter())
            }
            None => self.next_backoff(),
        }
    }

    /// Number of attempts consumed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    fn random_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let mut rng = rand::rng();
        Duration::from_millis(rng.random_range(0..=self.jitter.as_millis() as u64))
    }
}
