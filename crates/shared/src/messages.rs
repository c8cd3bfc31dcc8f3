use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Current user as seen by the auth and admin guards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_admin: bool,
}

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Label shown in the admin user table
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "مدیر",
            Role::User => "کاربر",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

// ============================================================================
// Admin panel
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRole {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_messages: i64,
    pub today_messages: i64,
    pub weekly_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub message: String,
    pub response: Option<String>,
    pub session_id: Option<String>,
    pub created_at: Option<String>,
}

pub const WORDPRESS_URL_KEY: &str = "wordpress_url";
pub const WORDPRESS_API_KEY_KEY: &str = "wordpress_api_key";
pub const WORDPRESS_API_SECRET_KEY: &str = "wordpress_api_secret";

/// WordPress/WooCommerce credentials stored as key/value integration rows
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrationSettings {
    #[serde(default)]
    pub wordpress_url: String,
    #[serde(default)]
    pub wordpress_api_key: String,
    #[serde(default)]
    pub wordpress_api_secret: String,
}

impl IntegrationSettings {
    pub const KEYS: [&'static str; 3] = [
        WORDPRESS_URL_KEY,
        WORDPRESS_API_KEY_KEY,
        WORDPRESS_API_SECRET_KEY,
    ];

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                WORDPRESS_URL_KEY => settings.wordpress_url = value.into(),
                WORDPRESS_API_KEY_KEY => settings.wordpress_api_key = value.into(),
                WORDPRESS_API_SECRET_KEY => settings.wordpress_api_secret = value.into(),
                _ => {}
            }
        }
        settings
    }

    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (WORDPRESS_URL_KEY, self.wordpress_url.as_str()),
            (WORDPRESS_API_KEY_KEY, self.wordpress_api_key.as_str()),
            (WORDPRESS_API_SECRET_KEY, self.wordpress_api_secret.as_str()),
        ]
    }

    /// All three credentials present
    pub fn is_complete(&self) -> bool {
        !self.wordpress_url.is_empty()
            && !self.wordpress_api_key.is_empty()
            && !self.wordpress_api_secret.is_empty()
    }
}

// ============================================================================
// Chat
// ============================================================================

/// Payload forwarded by the chat proxy to the workflow webhook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatProxyRequest {
    pub message: String,
    pub user_id: String,
    pub timestamp: String,
}

/// One finished exchange, persisted after the reply arrives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLogEntry {
    pub message: String,
    pub response: Option<String>,
    pub session_id: Option<String>,
}

// ============================================================================
// WordPress sync
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_integration_settings_from_pairs() {
        let settings = IntegrationSettings::from_pairs(vec![
            ("wordpress_url", "https://shop.example"),
            ("wordpress_api_key", "ck_1"),
            ("unrelated", "ignored"),
        ]);
        assert_eq!(settings.wordpress_url, "https://shop.example");
        assert_eq!(settings.wordpress_api_key, "ck_1");
        assert!(settings.wordpress_api_secret.is_empty());
        assert!(!settings.is_complete());
    }

    #[test]
    fn test_integration_settings_pairs_cover_all_keys() {
        let settings = IntegrationSettings {
            wordpress_url: "u".into(),
            wordpress_api_key: "k".into(),
            wordpress_api_secret: "s".into(),
        };
        assert!(settings.is_complete());
        let keys: Vec<_> = settings.pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, IntegrationSettings::KEYS.to_vec());
    }

    #[test]
    fn test_sync_request_without_data() {
        let req: SyncRequest = serde_json::from_str(r#"{"action":"get_sync_status"}"#).unwrap();
        assert_eq!(req.action, "get_sync_status");
        assert!(req.data.is_none());
    }
}
