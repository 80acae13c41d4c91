//! # Actor
//!
//! The principal on whose behalf a mutating operation runs.

use serde::{Deserialize, Serialize};

/// Identity recorded with every audited operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Stable user identifier.
    pub user_id: String,
    /// Human-readable username at the time of the operation.
    pub username: String,
}

impl Actor {
    /// Identifier used for operations started by the vault itself.
    pub const SYSTEM_ID: &'static str = "system";

    /// Create an actor.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    /// The internal system actor (retention sweeps, pre-restore backups, startup).
    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ID, Self::SYSTEM_ID)
    }

    /// Whether this actor is the internal system actor.
    pub fn is_system(&self) -> bool {
        self.user_id == Self::SYSTEM_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_actor() {
        let actor = Actor::system();
        assert!(actor.is_system());
        assert!(!Actor::new("u-1", "alice").is_system());
    }

    #[test]
    fn test_actor_serializes_camel_case() {
        let json = serde_json::to_value(Actor::new("u-1", "alice")).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["username"], "alice");
    }
}
