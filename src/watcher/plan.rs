//! Connection attempt planning.

use std::num::NonZeroU64;
use std::time::Duration;

use crate::config::ConfigError;

/// How many times to try opening a session before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptLimit {
    /// Retry forever.
    #[default]
    Unbounded,
    /// Give up after this many attempts.
    Bounded(NonZeroU64),
}

impl AttemptLimit {
    /// Interpret a configured attempt count; zero or negative means unbounded.
    #[must_use]
    pub fn from_count(count: i64) -> Self {
        u64::try_from(count)
            .ok()
            .and_then(NonZeroU64::new)
            .map_or(Self::Unbounded, Self::Bounded)
    }
}

/// Validate a retry delay given in seconds.
///
/// # Errors
///
/// Returns `ConfigError::InvalidRetryDelay` if the value is negative or not finite.
/// Finite values too large for a `Duration` saturate to `Duration::MAX`.
pub fn retry_delay_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    } else {
        Err(ConfigError::InvalidRetryDelay { value: secs })
    }
}

/// One planned connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAttempt {
    /// 1-based attempt number.
    pub number: u64,
    /// Delay before the next attempt, or `None` if this is the last one.
    pub retry_delay: Option<Duration>,
}

/// Lazily produced sequence of connection attempts.
///
/// Unbounded plans never end and every attempt carries a delay. A plan
/// bounded to `K` yields `K` attempts and only the last one has no delay.
#[derive(Debug, Clone)]
pub struct AttemptPlan {
    limit: AttemptLimit,
    retry_delay: Duration,
    next: u64,
}

impl AttemptPlan {
    #[must_use]
    pub fn new(limit: AttemptLimit, retry_delay: Duration) -> Self {
        Self {
            limit,
            retry_delay,
            next: 1,
        }
    }
}

impl Iterator for AttemptPlan {
    type Item = ConnectionAttempt;

    fn next(&mut self) -> Option<Self::Item> {
        let number = self.next;
        let retry_delay = match self.limit {
            AttemptLimit::Unbounded => Some(self.retry_delay),
            AttemptLimit::Bounded(max) if number < max.get() => Some(self.retry_delay),
            AttemptLimit::Bounded(max) if number == max.get() => None,
            AttemptLimit::Bounded(_) => return None,
        };
        self.next = self.next.saturating_add(1);
        Some(ConnectionAttempt {
            number,
            retry_delay,
        })
    }
}
