//! # Domain Layer
//!
//! Pure storage rules: the directory taxonomy, category policies, content
//! inspection and the error type. No I/O lives here.

pub mod config;
pub mod content;
pub mod errors;
pub mod layout;
