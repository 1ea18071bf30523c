//! Lifecycle configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default ticket time-to-live in minutes.
pub const DEFAULT_TTL_MINUTES: i64 = 15;

/// Default age after which cleanup purges a ticket, in hours.
pub const DEFAULT_CLEANUP_MAX_AGE_HOURS: i64 = 24;

/// Longest ticket TTL honoured, in minutes (one year).
pub const MAX_TTL_MINUTES: i64 = 366 * 24 * 60;

/// Largest cleanup age threshold honoured, in hours (a century).
pub const MAX_CLEANUP_MAX_AGE_HOURS: i64 = 100 * 366 * 24;

/// Timing knobs of the ticket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Ticket TTL in minutes (`expires_at = created_at + ttl`)
    pub ttl_minutes: i64,
    /// Default age threshold for `cleanup_expired`, in hours
    pub cleanup_max_age_hours: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_TTL_MINUTES,
            cleanup_max_age_hours: DEFAULT_CLEANUP_MAX_AGE_HOURS,
        }
    }
}

impl LifecycleConfig {
    /// Override the ticket TTL.
    #[must_use]
    pub const fn with_ttl_minutes(mut self, minutes: i64) -> Self {
        self.ttl_minutes = minutes;
        self
    }

    /// Override the cleanup age threshold.
    #[must_use]
    pub const fn with_cleanup_max_age_hours(mut self, hours: i64) -> Self {
        self.cleanup_max_age_hours = hours;
        self
    }

    /// TTL as a duration, clamped to `1..=MAX_TTL_MINUTES`.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes.clamp(1, MAX_TTL_MINUTES))
    }

    /// Cleanup threshold as a duration. See [`max_age`].
    #[must_use]
    pub fn cleanup_max_age(&self) -> Duration {
        max_age(self.cleanup_max_age_hours)
    }
}

/// Age threshold of `hours`, clamped to `0..=MAX_CLEANUP_MAX_AGE_HOURS`.
#[must_use]
pub fn max_age(hours: i64) -> Duration {
    Duration::hours(hours.clamp(0, MAX_CLEANUP_MAX_AGE_HOURS))
}
