//! Limit policies and the built-in presets.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fraction of checks that also sweep expired entries.
pub const DEFAULT_CLEANUP_PROBABILITY: f64 = 0.01;

/// One limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Span during which attempts accumulate.
    pub window: Duration,
    /// Attempts allowed per window.
    pub max_attempts: u32,
    /// How long a key stays denied after its last allowed attempt once the
    /// limit is reached.
    pub block_duration: Duration,
}

impl RateLimitConfig {
    pub const fn new(window: Duration, max_attempts: u32, block_duration: Duration) -> Self {
        Self {
            window,
            max_attempts,
            block_duration,
        }
    }

    /// 5 attempts per 15 minutes, 30 minute block.
    pub const fn login() -> Self {
        Self::new(minutes(15), 5, minutes(30))
    }

    /// 100 requests per minute, 1 minute block.
    pub const fn api() -> Self {
        Self::new(minutes(1), 100, minutes(1))
    }

    /// 20 uploads per hour, 1 hour block.
    pub const fn upload() -> Self {
        Self::new(minutes(60), 20, minutes(60))
    }

    /// 3 requests per hour, 1 hour block.
    pub const fn password_reset() -> Self {
        Self::new(minutes(60), 3, minutes(60))
    }

    /// Preset by name (`login`, `api`, `upload`, `password_reset`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "login" => Some(Self::login()),
            "api" => Some(Self::api()),
            "upload" => Some(Self::upload()),
            "password_reset" => Some(Self::password_reset()),
            _ => None,
        }
    }

    pub(crate) fn window_ms(&self) -> i64 {
        duration_ms(self.window)
    }

    pub(crate) fn block_ms(&self) -> i64 {
        duration_ms(self.block_duration)
    }
}

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let login = RateLimitConfig::login();
        assert_eq!(login.max_attempts, 5);
        assert_eq!(login.window_ms(), 15 * 60 * 1000);
        assert_eq!(login.block_ms(), 30 * 60 * 1000);

        assert_eq!(RateLimitConfig::api().max_attempts, 100);
        assert_eq!(RateLimitConfig::upload().max_attempts, 20);
        assert_eq!(
            RateLimitConfig::preset("password_reset"),
            Some(RateLimitConfig::password_reset())
        );
        assert_eq!(RateLimitConfig::preset("signup"), None);
    }
}
