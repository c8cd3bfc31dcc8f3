use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse, ProfileUpdate, RegisterRequest,
    ResetPasswordRequest, Role,
};
use uuid::Uuid;

use crate::{
    config::SmtpConfig,
    db::{Profile, User},
    error::AppError,
    routes::guard::AuthUser,
    state::{AppState, PasswordResetState},
};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Create a login, profile and role row in one go
pub async fn create_account(
    state: &AppState,
    email: &str,
    password: &str,
    full_name: Option<String>,
) -> Result<String, AppError> {
    let password_hash = hash_password(password)?;
    let user_id = Uuid::new_v4().to_string();
    let user = User {
        id: user_id.clone(),
        email: email.to_string(),
        password_hash,
    };
    let profile = Profile::new(&user_id, email, full_name);
    let role = if state.config.is_admin_email(email) {
        Role::Admin
    } else {
        Role::User
    };
    state.db.create_account(&user, &profile, role).await?;
    tracing::info!("Created account {} ({}) as {}", user_id, email, role.as_str());
    Ok(user_id)
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password must be at least 6 characters".to_string()));
    }

    // Check if user already exists
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let full_name = req.full_name.filter(|n| !n.trim().is_empty());
    let user_id = create_account(&state, &email, &req.password, full_name).await?;
    let token = generate_token(&user_id, &state.config.auth)?;

    Ok(Json(AuthResponse { token, user_id }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // Find user
    let user = state
        .db
        .get_user_by_email(&req.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::AuthError("Invalid email or password".to_string()))?;

    let token = generate_token(&user.id, &state.config.auth)?;

    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
    }))
}

fn generate_token(user_id: &str, auth_config: &crate::config::AuthConfig) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(auth_config.token_expiry_hours as i64))
        .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth_config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthError(e.to_string()))
}

async fn load_me(state: &AppState, user_id: &str) -> Result<MeResponse, AppError> {
    let profile = state
        .db
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    let role = state.db.get_role(user_id).await?;

    Ok(MeResponse {
        user_id: profile.id,
        email: profile.email,
        full_name: profile.full_name,
        avatar_url: profile.avatar_url,
        role,
        is_admin: role == Role::Admin,
    })
}

/// Current user with effective role
/// GET /auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<MeResponse>, AppError> {
    Ok(Json(load_me(&state, &user.user_id).await?))
}

/// PUT /auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<MeResponse>, AppError> {
    let updated = state
        .db
        .update_profile(&user.user_id, req.full_name.as_deref(), req.avatar_url.as_deref())
        .await?;
    if !updated {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }
    tracing::info!("Profile updated for {}", user.user_id);
    Ok(Json(load_me(&state, &user.user_id).await?))
}

// ============================================================================
// Password Reset Flow
// ============================================================================

const RESET_NOTICE: &str = "If your email is registered, you will receive a password reset link.";

/// Request password reset email
/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = state.db.get_user_by_email(&email).await?;

    // Always return success to prevent email enumeration
    if user.is_none() {
        tracing::info!("Password reset requested for non-existent email: {}", email);
        return Ok(Json(serde_json::json!({ "success": true, "message": RESET_NOTICE })));
    }

    let token: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    state.password_reset_tokens.insert(
        token.clone(),
        PasswordResetState {
            email: email.clone(),
            expires_at: Utc::now() + Duration::hours(1),
        },
    );

    if state.config.smtp.enabled {
        let reset_url = format!(
            "{}/reset-password?token={}",
            state.config.coach.public_url.trim_end_matches('/'),
            token
        );

        if let Err(e) = send_password_reset_email(&state.config.smtp, &email, &reset_url).await {
            tracing::error!("Failed to send password reset email: {}", e);
        } else {
            tracing::info!("Password reset email sent to {}", email);
        }
    } else {
        tracing::warn!("SMTP not configured, password reset token: {} for {}", token, email);
    }

    Ok(Json(serde_json::json!({ "success": true, "message": RESET_NOTICE })))
}

/// Reset password with token
/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.password_reset_tokens.retain(|_, v| v.expires_at > Utc::now());

    let email = state
        .password_reset_tokens
        .get(&req.token)
        .map(|entry| entry.email.clone())
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password must be at least 6 characters".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    if !state.db.update_user_password(&email, &password_hash).await? {
        return Err(AppError::Internal("Failed to update password".to_string()));
    }

    state.password_reset_tokens.remove(&req.token);
    tracing::info!("Password reset completed for {}", email);

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Password has been reset successfully."
    })))
}

async fn send_password_reset_email(
    smtp_config: &SmtpConfig,
    to_email: &str,
    reset_url: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let email = Message::builder()
        .from(format!("{} <{}>", smtp_config.from_name, smtp_config.from_email).parse()?)
        .to(to_email.parse()?)
        .subject("بازیابی رمز عبور")
        .header(ContentType::TEXT_HTML)
        .body(format!(
            r#"<!DOCTYPE html>
<html dir="rtl">
<head>
    <meta charset="UTF-8">
    <title>بازیابی رمز عبور</title>
</head>
<body style="font-family: Tahoma, sans-serif; line-height: 1.8; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>بازیابی رمز عبور</h2>
    <p>برای تعیین رمز عبور جدید روی دکمه زیر کلیک کنید:</p>
    <p style="text-align: center; margin: 30px 0;">
        <a href="{}" style="background-color: #0891b2; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">تعیین رمز جدید</a>
    </p>
    <p style="word-break: break-all; color: #666;" dir="ltr">{}</p>
    <p style="color: #666; font-size: 14px;">این لینک تا یک ساعت معتبر است.</p>
</body>
</html>"#,
            reset_url, reset_url
        ))?;

    if smtp_config.use_sendmail {
        let mailer = AsyncSendmailTransport::<Tokio1Executor>::new();
        mailer.send(email).await?;
        return Ok(());
    }

    let creds = Credentials::new(smtp_config.username.clone(), smtp_config.password.clone());
    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_config.host)?
            .credentials(creds)
            .port(smtp_config.port)
            .build();

    mailer.send(email).await?;
    Ok(())
}
