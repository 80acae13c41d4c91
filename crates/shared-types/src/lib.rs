//! # Shared Types Crate
//!
//! Types that cross subsystem boundaries in the vault core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the audit vocabulary and the error taxonomy
//!   are defined once here and reused by storage, backup, audit and runtime.
//! - **Ports, not implementations**: subsystems that must emit audit entries
//!   depend on the [`AuditSink`] trait, never on the concrete logger. This keeps
//!   the dependency graph leaf-to-root (storage and backup do not depend on
//!   `rv-04-audit-log`).

pub mod actor;
pub mod audit;
pub mod clock;
pub mod errors;
pub mod testing;

pub use actor::Actor;
pub use audit::{AuditAction, AuditEvent, AuditOptions, AuditSink, NoopAuditSink, Severity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::ErrorClass;
