//! Inbound adapters.

#[cfg(feature = "http")]
pub mod http;
