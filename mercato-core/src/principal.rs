use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer classification driving discount eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerTier {
    Standard,
    Premium,
    Employee,
    Admin,
}

/// The resolved caller identity, supplied by the request boundary on every
/// call. The engine never looks principals up itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub tier: CustomerTier,
}

impl Principal {
    pub fn new(user_id: Uuid, username: impl Into<String>, tier: CustomerTier) -> Self {
        Self {
            user_id,
            username: username.into(),
            tier,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.tier, CustomerTier::Admin)
    }
}
