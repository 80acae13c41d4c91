//! # Rate Limiter Service
//!
//! In-memory table of attempt histories keyed by `(identity, endpoint)`.
//!
//! ## State Machine (per key)
//!
//! | State | Next attempt |
//! |-------|--------------|
//! | absent, or window over | count = 1, allow, window reset at `now + window` |
//! | inside window, under limit | count += 1, allow |
//! | blocked (limit reached, `now < last_attempt + block`) | deny, report block end |
//! | block elapsed | fresh window, allow |
//!
//! Each key's transition runs under its `DashMap` shard lock, so concurrent
//! checks on one key are serialised. Expired entries are swept lazily on a
//! random fraction of checks.

use crate::domain::config::{RateLimitConfig, DEFAULT_CLEANUP_PROBABILITY};
use crate::domain::entry::{RateLimitDecision, RateLimitEntry};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{debug, warn};

type Key = (String, String);

pub struct RateLimiter {
    entries: DashMap<Key, RateLimitEntry>,
    clock: Arc<dyn Clock>,
    cleanup_probability: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            cleanup_probability: DEFAULT_CLEANUP_PROBABILITY,
        }
    }

    /// Override the sweep probability (clamped to `0.0..=1.0`).
    pub fn with_cleanup_probability(mut self, probability: f64) -> Self {
        self.cleanup_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Count one attempt by `identity` against `endpoint`.
    pub fn check_rate_limit(
        &self,
        identity: &str,
        endpoint: &str,
        config: &RateLimitConfig,
    ) -> RateLimitDecision {
        let now = self.clock.now_ms();
        if self.cleanup_probability > 0.0 && rand::random::<f64>() < self.cleanup_probability {
            self.cleanup_at(now);
        }

        let decision = match self.entries.entry((identity.to_string(), endpoint.to_string())) {
            Entry::Vacant(slot) => slot.insert(RateLimitEntry::first(now, config)).allowed(config),
            Entry::Occupied(mut slot) => slot.get_mut().attempt(now, config),
        };

        if !decision.allowed {
            warn!(
                identity,
                endpoint,
                reset_time = decision.reset_time,
                "Rate limit exceeded"
            );
        }
        decision
    }

    /// Forget the key's history after a successful authentication.
    pub fn record_successful_auth(&self, identity: &str, endpoint: &str) {
        if self
            .entries
            .remove(&(identity.to_string(), endpoint.to_string()))
            .is_some()
        {
            debug!(identity, endpoint, "Attempt history cleared");
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(self.clock.now_ms())
    }

    fn cleanup_at(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Swept expired rate-limit entries");
        }
        removed
    }

    /// Keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of one key's state.
    pub fn entry(&self, identity: &str, endpoint: &str) -> Option<RateLimitEntry> {
        self.entries
            .get(&(identity.to_string(), endpoint.to_string()))
            .map(|e| *e)
    }
}
