//! Bearer-token cache with expiry tracking.
//!
//! The partner API issues short-lived JWT tokens (about 10 minutes). The
//! store keeps the current token in memory and hands it out while it is at
//! least a safety window away from expiry, so a warm process re-authenticates
//! roughly once per lifetime instead of once per request. A cold start simply
//! logs in again; nothing is persisted.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Monotonic time source, injected so tests can control expiry.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A cached bearer token with its expiry instant.
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The raw token value.
    pub value: String,
    /// Instant after which the token must not be used.
    pub expires_at: Instant,
}

/// Explicit, injected token cache (never a module-level global).
///
/// The mutex covers the whole check-then-write sequence for one caller;
/// concurrent callers that race past an expired token perform redundant
/// logins, which the upstream treats as idempotent.
pub struct TokenStore<C: Clock = SystemClock> {
    cached: Mutex<Option<CachedToken>>,
    safety_window: Duration,
    clock: C,
}

impl TokenStore<SystemClock> {
    /// Create a store using the system clock.
    #[must_use]
    pub fn new(safety_window: Duration) -> Self {
        Self::with_clock(safety_window, SystemClock)
    }
}

impl<C: Clock> TokenStore<C> {
    /// Create a store with an injected clock.
    #[must_use]
    pub fn with_clock(safety_window: Duration, clock: C) -> Self {
        Self {
            cached: Mutex::new(None),
            safety_window,
            clock,
        }
    }

    /// Get the cached token if it is still comfortably inside its lifetime.
    pub async fn fresh_token(&self) -> Option<String> {
        let guard = self.cached.lock().await;
        guard.as_ref().and_then(|token| {
            let deadline = token.expires_at.checked_sub(self.safety_window)?;
            if self.clock.now() < deadline {
                Some(token.value.clone())
            } else {
                None
            }
        })
    }

    /// Replace the cached token wholesale.
    pub async fn store(&self, value: String, lifetime: Duration) {
        let token = CachedToken {
            value,
            expires_at: self.clock.now() + lifetime,
        };
        *self.cached.lock().await = Some(token);
    }

    /// Drop the cached token (after an upstream 401).
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

impl<C: Clock> std::fmt::Debug for TokenStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("safety_window", &self.safety_window)
            .finish_non_exhaustive()
    }
}
