//! Cross-crate flows.

#[cfg(test)]
pub(crate) mod fixtures;

mod audit_flows;
mod backup_flows;
mod rate_limit_flows;
mod storage_flows;
