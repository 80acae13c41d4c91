//! # Domain Layer
//!
//! The persisted entry, query filter, configuration and errors.

pub mod config;
pub mod entry;
pub mod errors;
pub mod query;
