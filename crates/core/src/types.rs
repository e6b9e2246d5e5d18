//! Domain types shared by the client and the access controller

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization class of a signed-in member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// All known roles
    pub const ALL: [Self; 2] = [Self::Admin, Self::User];

    /// Wire name of the role
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

/// Minimal identity of the signed-in member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

/// Client-side authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub role: Option<Role>,
    pub user: Option<UserSummary>,
}

impl Session {
    /// Build an authenticated session
    pub fn authenticated(
        access_token: impl Into<String>,
        role: Role,
        user: Option<UserSummary>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            role: Some(role),
            user,
        }
    }

    /// True iff an access token is held
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_wire_names() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn role_rejects_unknown_and_lowercase() {
        assert!(matches!(
            "admin".parse::<Role>(),
            Err(CoreError::InvalidRole { .. })
        ));
        assert!("GUEST".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn authentication_follows_access_token() {
        let empty = Session::default();
        assert!(!empty.is_authenticated());

        let session = Session::authenticated("token", Role::User, None);
        assert!(session.is_authenticated());

        let without_token = Session {
            access_token: None,
            role: Some(Role::Admin),
            user: None,
        };
        assert!(!without_token.is_authenticated());
    }
}
