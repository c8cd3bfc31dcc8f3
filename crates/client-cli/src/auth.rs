//! Account commands: sign-up, sign-in and profile

use anyhow::{bail, Result};
use shared::{LoginRequest, ProfileUpdate, RegisterRequest, ResetPasswordRequest};
use std::io::{BufRead, Write};

use crate::{
    api::ApiClient,
    config::Config,
};

/// Read one line from stdin after printing `label`
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => prompt(label),
    }
}

fn store_token(config: &mut Config, token: String) -> Result<()> {
    config.remote.token = Some(token);
    config.save()
}

pub async fn register(
    api: &ApiClient,
    config: &mut Config,
    email: Option<String>,
    password: Option<String>,
    full_name: Option<String>,
) -> Result<()> {
    let request = RegisterRequest {
        email: value_or_prompt(email, "Email")?,
        password: value_or_prompt(password, "Password")?,
        full_name,
    };
    let auth = api.register(&request).await?;
    store_token(config, auth.token)?;

    println!("\x1b[1;32m✅ ثبت‌نام با موفقیت انجام شد\x1b[0m");
    println!("\x1b[90mUser ID: {}\x1b[0m", auth.user_id);
    Ok(())
}

pub async fn login(
    api: &ApiClient,
    config: &mut Config,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let request = LoginRequest {
        email: value_or_prompt(email, "Email")?,
        password: value_or_prompt(password, "Password")?,
    };
    let auth = api.login(&request).await?;
    store_token(config, auth.token)?;

    println!("\x1b[1;32m✅ Login successful!\x1b[0m");
    println!("\x1b[90mUser ID: {}\x1b[0m", auth.user_id);
    Ok(())
}

/// Logout by clearing the stored token
pub fn logout(config: &mut Config) -> Result<()> {
    config.remote.token = None;
    config.save()?;
    println!("\x1b[32m✅ Logged out successfully\x1b[0m");
    Ok(())
}

/// Show current login status, validated against the server
pub async fn whoami(api: &ApiClient, server_url: &str) -> Result<()> {
    if !api.session().is_signed_in() {
        println!("\x1b[33m✗ Not logged in\x1b[0m");
        println!("Run '\x1b[1mcoach login\x1b[0m' to authenticate");
        return Ok(());
    }

    match api.me().await {
        Ok(me) => {
            println!("\x1b[32m✓ Logged in\x1b[0m");
            println!("Server: {}", server_url);
            println!("Email: {}", me.email);
            if let Some(name) = &me.full_name {
                println!("Name: {}", name);
            }
            println!("Role: {}", me.role.label());
        }
        Err(e) => {
            println!("\x1b[33m✗ Stored token was rejected: {}\x1b[0m", e);
            println!("Run '\x1b[1mcoach login\x1b[0m' to authenticate");
        }
    }
    Ok(())
}

pub async fn forgot_password(api: &ApiClient, email: Option<String>) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    api.forgot_password(&email).await?;
    println!("If your email is registered, you will receive a password reset link.");
    Ok(())
}

pub async fn reset_password(api: &ApiClient, token: String, password: Option<String>) -> Result<()> {
    let request = ResetPasswordRequest {
        token,
        password: value_or_prompt(password, "New password")?,
    };
    api.reset_password(&request).await?;
    println!("\x1b[32m✅ Password updated. You can now log in.\x1b[0m");
    Ok(())
}

pub async fn profile(api: &ApiClient, full_name: Option<String>, avatar_url: Option<String>) -> Result<()> {
    let me = if full_name.is_none() && avatar_url.is_none() {
        api.me().await?
    } else {
        api.update_profile(&ProfileUpdate { full_name, avatar_url }).await?
    };

    println!("Email: {}", me.email);
    println!("Name: {}", me.full_name.as_deref().unwrap_or("-"));
    println!("Avatar: {}", me.avatar_url.as_deref().unwrap_or("-"));
    println!("Role: {}", me.role.label());
    Ok(())
}

/// User id behind the session, or an error telling the user to log in
pub async fn current_user_id(api: &ApiClient) -> Result<String> {
    if !api.session().is_signed_in() {
        bail!("Not logged in. Run 'coach login' first.");
    }
    Ok(api.me().await?.user_id)
}
