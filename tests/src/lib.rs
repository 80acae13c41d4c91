//! # Record Vault Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── integration/      # Cross-crate flows through a live VaultContext
//! │   ├── backup_flows.rs
//! │   ├── storage_flows.rs
//! │   ├── audit_flows.rs
//! │   └── rate_limit_flows.rs
//! │
//! └── exploits/         # Attack simulations against the storage boundary
//!     ├── path_traversal.rs
//!     └── hostile_snapshot.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rv-tests
//! cargo test -p rv-tests integration::
//! cargo test -p rv-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p rv-tests
//! ```

pub mod exploits;
pub mod integration;
