//! Authenticated caller passed from the HTTP layer into services

use crate::domain::{DomainError, DomainResult, UserRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }

    pub fn from_role(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: role == UserRole::Admin,
        }
    }

    /// Owners and admins pass; anyone else gets `Forbidden`.
    pub fn ensure_owner(&self, owner_id: &str) -> DomainResult<()> {
        if self.is_admin || self.user_id == owner_id {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "record belongs to another user".into(),
            ))
        }
    }

    pub fn ensure_admin(&self) -> DomainResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(DomainError::Forbidden("admin role required".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_admin_pass() {
        assert!(Caller::user("u1").ensure_owner("u1").is_ok());
        assert!(Caller::admin("a1").ensure_owner("u1").is_ok());
        assert!(matches!(
            Caller::user("u2").ensure_owner("u1"),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_check() {
        assert!(Caller::from_role("a1", UserRole::Admin).ensure_admin().is_ok());
        assert!(Caller::from_role("u1", UserRole::User).ensure_admin().is_err());
    }
}
