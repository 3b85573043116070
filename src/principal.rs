use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// Authenticated identity supplied by the caller's session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Coordinator,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
}

impl Principal {
    pub fn coordinator(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
            role: Role::Coordinator,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Only admins decide on reservations.
    pub fn require_admin(&self) -> Result<(), EngineError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!("{} is not an admin", self.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_cannot_decide() {
        assert!(Principal::admin("ana").require_admin().is_ok());
        let err = Principal::coordinator("cory").require_admin().unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }
}
