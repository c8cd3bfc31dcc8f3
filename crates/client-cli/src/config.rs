use anyhow::{bail, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "http://localhost:8080";
pub const DEFAULT_FOLLOW_UP_URL: &str = "https://t.me/your_coaching_bot";

pub const KEYS: [&str; 3] = ["server", "token", "follow_up_url"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub coach: CoachConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub server: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Where coaching follow-ups continue with a human coach
    pub follow_up_url: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            follow_up_url: DEFAULT_FOLLOW_UP_URL.to_string(),
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "coach", "coach")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn server(&self) -> String {
        self.remote
            .server
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "server" => self.remote.server = Some(value.trim_end_matches('/').to_string()),
            "token" => self.remote.token = Some(value),
            "follow_up_url" => self.coach.follow_up_url = value,
            _ => bail!("Unknown config key: {}. Valid keys: {}", key, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Display value for `key`; the token is masked
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "server" => self.server(),
            "token" => self.remote.token.as_ref().map(|_| "****").unwrap_or_default().to_string(),
            "follow_up_url" => self.coach.follow_up_url.clone(),
            _ => bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }
}
