//! # Rate Limiter (rv-05)
//!
//! Counts attempts per `(client identity, endpoint)` and denies further
//! attempts for a block period once a policy's limit is reached. Guards the
//! authentication entry points.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Bounded attempts | At most `max_attempts` allowed per key per window |
//! | 2 | Block from last attempt | A blocked key is denied until `last_attempt + block_duration` |
//! | 3 | Forgiveness | `record_successful_auth` erases the key's history |
//! | 4 | Bounded memory | Expired entries are swept lazily on a fraction of checks |
//! | 5 | Process-local | State lives in memory only; a restart forgets it |
//!
//! ## Usage
//!
//! ```ignore
//! let limiter = Arc::new(RateLimiter::default());
//! let decision = limiter.check_rate_limit(&ip, "login", &RateLimitConfig::login());
//! if !decision.allowed {
//!     return rate_limit_response(&decision, &RateLimitConfig::login(), limiter.now_ms());
//! }
//! // ... verify credentials ...
//! limiter.record_successful_auth(&ip, "login");
//! ```

pub mod adapters;
pub mod domain;
pub mod service;

#[cfg(feature = "http")]
pub use adapters::http::{
    extract_client_ip, rate_limit_response, RateLimitLayer, RateLimitService,
};
pub use domain::config::{RateLimitConfig, DEFAULT_CLEANUP_PROBABILITY};
pub use domain::entry::{RateLimitDecision, RateLimitEntry};
pub use service::RateLimiter;
