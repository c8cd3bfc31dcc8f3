use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub coach: CoachConfig,
    #[serde(default)]
    pub wordpress: WordPressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: u64,
    /// Accounts registered with these emails start with the admin role
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    /// Use local sendmail binary instead of SMTP server
    #[serde(default = "default_true")]
    pub use_sendmail: bool,
    /// SMTP server host (only used if use_sendmail is false)
    #[serde(default)]
    pub host: String,
    /// SMTP server port (only used if use_sendmail is false)
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// SMTP username (only used if use_sendmail is false)
    #[serde(default)]
    pub username: String,
    /// SMTP password (only used if use_sendmail is false)
    #[serde(default)]
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

/// Workflow webhook behind the AI-coach proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    pub webhook_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Public site address used in emailed links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordPressConfig {
    /// Bearer token the WordPress plugin presents on sync pushes.
    /// Empty means only admins may call the sync endpoint.
    #[serde(default)]
    pub sync_token: String,
}

fn default_true() -> bool { true }
fn default_smtp_port() -> u16 { 587 }
fn default_timeout_secs() -> u64 { 60 }
fn default_public_url() -> String { "http://localhost:5173".to_string() }

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: true,  // Enable by default, using sendmail
            use_sendmail: true,
            host: "".to_string(),
            port: 587,
            username: "".to_string(),
            password: "".to_string(),
            from_email: "noreply@coach.local".to_string(),
            from_name: "مشاور هوشمند".to_string(),
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            webhook_url: "http://localhost:5678/webhook/ai-coach".to_string(),
            timeout_secs: default_timeout_secs(),
            public_url: default_public_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: "./data/coach.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                token_expiry_hours: 24,
                admin_emails: Vec::new(),
            },
            smtp: SmtpConfig::default(),
            coach: CoachConfig::default(),
            wordpress: WordPressConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Try to load from environment variable
        if let Ok(path) = std::env::var("COACH_CONFIG") {
            return Self::load_from_path(&PathBuf::from(path));
        }

        // Try to load from default locations
        let default_paths = vec![
            PathBuf::from("coach-server.toml"),
            PathBuf::from("config/coach-server.toml"),
            PathBuf::from("/etc/coach/server.toml"),
        ];

        for path in default_paths {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // Return default config if no file found
        tracing::warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.auth
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            path = "/tmp/coach.db"

            [auth]
            jwt_secret = "s"
            token_expiry_hours = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.coach.timeout_secs, 60);
        assert!(config.wordpress.sync_token.is_empty());
        assert!(config.auth.admin_emails.is_empty());
        assert!(config.smtp.use_sendmail);
    }

    #[test]
    fn test_coach_section() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            [database]
            path = "db"
            [auth]
            jwt_secret = "s"
            token_expiry_hours = 24
            admin_emails = ["Admin@Example.com"]
            [coach]
            webhook_url = "https://flows.example/webhook/abc"
            timeout_secs = 30
            [wordpress]
            sync_token = "plugin-secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.coach.webhook_url, "https://flows.example/webhook/abc");
        assert_eq!(config.coach.timeout_secs, 30);
        assert_eq!(config.wordpress.sync_token, "plugin-secret");
        assert!(config.is_admin_email("admin@example.com"));
        assert!(!config.is_admin_email("user@example.com"));
    }
}
