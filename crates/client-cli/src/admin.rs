//! Admin panel commands

use anyhow::Result;
use serde_json::Value;
use shared::{IntegrationSettings, Role};

use crate::{api::ApiClient, resource::Resource, views};

const NOT_ADMIN: &str = "دسترسی مدیر لازم است. برای ادامه از 'coach chat' یا 'coach store' استفاده کنید.";

/// Whether the session belongs to an admin; non-admins get the dashboard hint
pub async fn require_admin(api: &ApiClient) -> Result<bool> {
    let me = Resource::load(|| api.me()).await.into_result()?;
    if !me.is_admin {
        tracing::debug!("{} is not an admin", me.email);
        eprintln!("\x1b[33m{}\x1b[0m", NOT_ADMIN);
        return Ok(false);
    }
    Ok(true)
}

pub async fn stats(api: &ApiClient) -> Result<()> {
    let stats = Resource::load(|| api.admin_stats()).await.into_result()?;
    println!("{}", views::stats(&stats));
    Ok(())
}

pub async fn users(api: &ApiClient) -> Result<()> {
    let users = Resource::load(|| api.admin_users()).await.into_result()?;
    println!("{}", views::users(&users));
    println!("\x1b[90m{}\x1b[0m", views::count(users.len(), "کاربر"));
    Ok(())
}

pub async fn set_role(api: &ApiClient, user_id: &str, role: Role) -> Result<()> {
    let user = api.set_role(user_id, role).await?;
    println!("{} → {}", user.email, user.role.label());
    Ok(())
}

pub async fn chat_history(api: &ApiClient) -> Result<()> {
    let history = Resource::load(|| api.chat_history()).await.into_result()?;
    println!("{}", views::history(&history));
    Ok(())
}

pub async fn settings(api: &ApiClient) -> Result<()> {
    let settings = Resource::load(|| api.settings()).await.into_result()?;
    println!("{}", views::settings(&settings));
    Ok(())
}

/// Overwrite only the settings that were given
pub async fn set_settings(
    api: &ApiClient,
    url: Option<String>,
    key: Option<String>,
    secret: Option<String>,
) -> Result<()> {
    let current = api.settings().await?;
    let updated = IntegrationSettings {
        wordpress_url: url.unwrap_or(current.wordpress_url),
        wordpress_api_key: key.unwrap_or(current.wordpress_api_key),
        wordpress_api_secret: secret.unwrap_or(current.wordpress_api_secret),
    };
    let saved = api.save_settings(&updated).await?;
    println!("{}", views::settings(&saved));
    Ok(())
}

pub async fn sync(api: &ApiClient, action: &str, data: Option<String>) -> Result<()> {
    let data = data
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()?;
    let (status, body) = api.sync(action, data).await?;
    println!("{}", views::sync_result(status, &body));
    Ok(())
}
