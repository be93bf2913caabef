use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Role assigned by the server. `app_metadata` cannot be edited by the
    /// user, so it wins over the generic `role` claim.
    pub fn effective_role(&self) -> Role {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str())
            .or(self.role.as_deref())
            .map(Role::parse)
            .unwrap_or(Role::User)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    User,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "administrator" | "admin" => Role::Administrator,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    /// Administrators may act on any row; everyone else only on their own.
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(role: Option<&str>, app_metadata: Option<serde_json::Value>) -> JwtClaims {
        JwtClaims {
            sub: "user-1".to_string(),
            exp: None,
            email: None,
            role: role.map(str::to_string),
            app_metadata,
            user_metadata: None,
            aud: None,
            iat: None,
        }
    }

    #[test]
    fn app_metadata_role_takes_precedence() {
        let c = claims(Some("authenticated"), Some(json!({ "role": "Administrator" })));
        assert_eq!(c.effective_role(), Role::Administrator);
    }

    #[test]
    fn unknown_roles_are_regular_users() {
        assert_eq!(claims(Some("authenticated"), None).effective_role(), Role::User);
        assert_eq!(claims(None, None).effective_role(), Role::User);
        assert_eq!(claims(Some("admin"), None).effective_role(), Role::Administrator);
    }

    #[test]
    fn owner_or_admin_access() {
        let user = User {
            id: "abc".to_string(),
            email: None,
            role: Role::User,
            metadata: None,
            created_at: None,
        };
        assert!(user.can_access("abc"));
        assert!(!user.can_access("xyz"));

        let admin = User { role: Role::Administrator, ..user };
        assert!(admin.can_access("xyz"));
    }
}
