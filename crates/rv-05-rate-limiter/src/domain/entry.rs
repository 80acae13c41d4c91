//! Per-key attempt state and the outcome of a check.

use crate::domain::config::RateLimitConfig;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Attempt history for one `(identity, endpoint)` key. Times are epoch ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: i64,
    pub last_attempt: i64,
    /// Set by the attempt that reaches the limit.
    pub blocked_until: Option<i64>,
}

/// Result of [`crate::RateLimiter::check_rate_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Epoch ms at which the window resets, or the block ends when denied.
    pub reset_time: i64,
    pub attempts_left: u32,
}

impl RateLimitEntry {
    pub(crate) fn first(now: i64, config: &RateLimitConfig) -> Self {
        let mut entry = Self {
            count: 1,
            reset_time: now.saturating_add(config.window_ms()),
            last_attempt: now,
            blocked_until: None,
        };
        entry.block_if_exhausted(config);
        entry
    }

    /// Advance the state machine by one attempt at `now`.
    pub(crate) fn attempt(&mut self, now: i64, config: &RateLimitConfig) -> RateLimitDecision {
        if let Some(until) = self.blocked_until {
            if now < until {
                return RateLimitDecision {
                    allowed: false,
                    reset_time: until,
                    attempts_left: 0,
                };
            }
            *self = Self::first(now, config);
        } else if now > self.reset_time {
            *self = Self::first(now, config);
        } else {
            self.count += 1;
            self.last_attempt = now;
            self.block_if_exhausted(config);
        }
        self.allowed(config)
    }

    fn block_if_exhausted(&mut self, config: &RateLimitConfig) {
        if self.count >= config.max_attempts {
            self.blocked_until = Some(self.last_attempt.saturating_add(config.block_ms()));
        }
    }

    pub(crate) fn allowed(&self, config: &RateLimitConfig) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            reset_time: self.reset_time,
            attempts_left: config.max_attempts.saturating_sub(self.count),
        }
    }

    /// Nothing left to remember at `now`: window over and no block running.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.reset_time && self.blocked_until.map_or(true, |until| now >= until)
    }
}

impl RateLimitDecision {
    pub fn reset_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.reset_time)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whole seconds until `reset_time`, at least one.
    pub fn retry_after_secs(&self, now: i64) -> u64 {
        let ms = self.reset_time.saturating_sub(now).max(0) as u64;
        ms.div_ceil(1000).max(1)
    }
}
