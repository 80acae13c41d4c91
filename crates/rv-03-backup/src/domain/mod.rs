//! # Domain Layer
//!
//! Snapshot format, backup identifiers, options and errors. No I/O.

pub mod config;
pub mod errors;
pub mod id;
pub mod snapshot;
pub mod tree;
