//! Who is calling.
//!
//! Authentication happens outside the core; services receive an already
//! verified [`Actor`] and only check ownership and role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::UserId;
use crate::CommerceError;

/// Role claim supplied by the identity collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Customer,
    /// Store staff: may move orders through fulfilment.
    Staff,
    /// Store administrator.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Check if this role has at least the given permission level.
    pub fn has_permission(&self, required: Role) -> bool {
        *self >= required
    }
}

impl FromStr for Role {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(CommerceError::validation(format!("unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn staff(user_id: UserId) -> Self {
        Self::new(user_id, Role::Staff)
    }

    /// Staff or higher.
    pub fn is_elevated(&self) -> bool {
        self.role.has_permission(Role::Staff)
    }

    /// Fail with `Forbidden` unless the actor holds the elevated claim.
    pub fn require_staff(&self, action: &str) -> Result<(), CommerceError> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(CommerceError::Forbidden(format!(
                "{} requires the staff role",
                action
            )))
        }
    }

    /// Owners see their own records; staff see everything.
    pub fn can_access(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_elevated()
    }
}
