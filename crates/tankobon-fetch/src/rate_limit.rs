//! Per-class request throttling.

use derive_more::{Display, From};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Category of outbound requests sharing one rate limit.
///
/// Connectors typically use one class for page requests and another for
/// image requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct RequestClass(pub u8);

impl RequestClass {
    /// Class used when a connector does not distinguish request kinds.
    pub const DEFAULT: Self = Self(1);
}

impl Default for RequestClass {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Minimum interval between two requests of the same class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitConfig {
    intervals: HashMap<RequestClass, Duration>,
    default_interval: Duration,
}

impl RateLimitConfig {
    /// Creates a configuration without any limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum interval for `class`.
    #[must_use]
    pub fn with_interval(mut self, class: impl Into<RequestClass>, interval: Duration) -> Self {
        self.intervals.insert(class.into(), interval);
        self
    }

    /// Allows at most `requests` requests per minute for `class`.
    ///
    /// Zero is treated as one request per minute.
    #[must_use]
    pub fn per_minute(self, class: impl Into<RequestClass>, requests: u32) -> Self {
        let interval = Duration::from_secs(60) / requests.max(1);
        self.with_interval(class, interval)
    }

    /// Sets the interval for classes that were not configured explicitly.
    #[must_use]
    pub const fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Returns the minimum interval for `class`.
    #[must_use]
    pub fn interval(&self, class: RequestClass) -> Duration {
        self.intervals
            .get(&class)
            .copied()
            .unwrap_or(self.default_interval)
    }
}

/// Enforces a [`RateLimitConfig`] across concurrent callers.
///
/// Each call to [`acquire`](Self::acquire) reserves the next free slot for its
/// class under a short lock and then sleeps until that slot without holding
/// the lock, so the reserved issue times of one class are always at least the
/// configured interval apart.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Issue time of the most recently reserved request per class.
    last_request: Mutex<HashMap<RequestClass, Instant>>,
}

impl RateLimiter {
    /// Creates a limiter for the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Waits until a request of `class` may be issued and returns its issue time.
    pub async fn acquire(&self, class: RequestClass) -> Instant {
        let now = Instant::now();
        let slot = self.reserve(class, now);

        if slot > now {
            tracing::trace!(
                class = %class,
                wait_ms = (slot - now).as_millis() as u64,
                "rate limit wait"
            );
            tokio::time::sleep_until(slot).await;
        }

        slot
    }

    fn reserve(&self, class: RequestClass, now: Instant) -> Instant {
        let interval = self.config.interval(class);
        let mut last_request = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let slot = last_request
            .get(&class)
            .map_or(now, |last| (*last + interval).max(now));
        last_request.insert(class, slot);
        slot
    }
}
