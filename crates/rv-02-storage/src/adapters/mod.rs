//! # Adapters
//!
//! - `lock`: process-level exclusive lock on the storage root (fs2)

#[cfg(feature = "locking")]
pub mod lock;
