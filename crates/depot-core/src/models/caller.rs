use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Caller role for upload authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Regular,
    Moderator,
    Admin,
}

impl Role {
    /// Moderators and admins.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Role::Anonymous => write!(f, "anonymous"),
            Role::Regular => write!(f, "regular"),
            Role::Moderator => write!(f, "moderator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anonymous" => Ok(Role::Anonymous),
            "regular" | "user" => Ok(Role::Regular),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow::anyhow!("Invalid role: {}", other)),
        }
    }
}

/// Identity of whoever is making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub role: Role,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    pub fn user(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some() && self.role != Role::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Moderator.is_staff());
        assert!(!Role::Regular.is_staff());
        assert!(!Role::Anonymous.is_staff());
        assert!(!Role::Moderator.is_admin());
    }

    #[test]
    fn test_anonymous_caller_is_not_authenticated() {
        assert!(!Caller::anonymous().is_authenticated());
        assert!(Caller::user(Uuid::new_v4(), Role::Regular).is_authenticated());
    }
}
