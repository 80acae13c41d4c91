//! # Domain Layer
//!
//! Policies, per-key state and check outcomes. No I/O.

pub mod config;
pub mod entry;
