//! Identity handed back by the authentication collaborator.

use serde::{Deserialize, Serialize};

/// Role that implicitly holds every permission.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AdminUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role == ADMIN_ROLE || self.permissions.iter().any(|p| p == permission)
    }
}

/// Result of `Authenticator::authenticate`.
#[derive(Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutcome {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AdminUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    pub fn success(user: AdminUser) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn failure(code: &str, message: &str) -> Self {
        Self {
            authenticated: false,
            user: None,
            error_code: Some(code.to_string()),
            error: Some(message.to_string()),
        }
    }
}
