use crate::{config::Config, db::Database};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Pending password reset, keyed by the emailed token
#[derive(Debug, Clone)]
pub struct PasswordResetState {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    /// Outbound client for the workflow webhook and WordPress
    pub http: reqwest::Client,
    pub password_reset_tokens: Arc<DashMap<String, PasswordResetState>>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config,
            http: reqwest::Client::new(),
            password_reset_tokens: Arc::new(DashMap::new()),
        }
    }
}
