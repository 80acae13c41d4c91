//! # Path Sanitizer (rv-01)
//!
//! Converts untrusted path segments (year, batch, roll number, event id,
//! filenames) into safe, traversal-free path components.
//!
//! ## Two Stages
//!
//! 1. [`sanitize`] is a pure function over one segment. Its output never
//!    contains `..` or a separator, so it always occupies exactly one
//!    directory level.
//! 2. [`resolve_and_validate`] rejects raw input containing `..` or `\`,
//!    joins the cleaned path to the base, canonicalizes it and re-checks
//!    containment. The second check catches symlinks that a purely lexical
//!    check cannot see.
//!
//! ## Invariant
//!
//! Every [`SafePath`] lies strictly below the canonical base directory.

mod errors;
mod filename;
mod resolve;
mod sanitize;

pub use errors::PathRejection;
pub use filename::{
    extension_of, unique_filename, unique_filename_at, validate_filename, DANGEROUS_EXTENSIONS,
    MAX_FILENAME_LEN,
};
pub use resolve::{resolve_and_validate, SafePath};
pub use sanitize::{join_segments, sanitize, REPLACEMENT};
