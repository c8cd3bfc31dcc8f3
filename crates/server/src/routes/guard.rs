//! Request guards: who is calling, and may they

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::Role;

use crate::{error::AppError, routes::auth::verify_token, state::AppState};

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Result<String, AppError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::AuthError("Missing or invalid Authorization header".to_string()))?;
    Ok(bearer.token().to_string())
}

/// Any signed-in user
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let claims = verify_token(&token, &state.config.auth.jwt_secret)?;
        Ok(Self { user_id: claims.sub })
    }
}

/// Signed-in user holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
}

async fn require_admin(state: &AppState, user_id: &str) -> Result<(), AppError> {
    if state.db.get_role(user_id).await? != Role::Admin {
        tracing::warn!("Non-admin {} tried an admin endpoint", user_id);
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser { user_id } = AuthUser::from_request_parts(parts, state).await?;
        require_admin(state, &user_id).await?;
        Ok(Self { user_id })
    }
}

/// Caller of the WordPress sync endpoint: the companion plugin with its
/// shared token, or an admin
#[derive(Debug, Clone)]
pub enum SyncCaller {
    Plugin,
    Admin(String),
}

#[async_trait]
impl FromRequestParts<AppState> for SyncCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let sync_token = &state.config.wordpress.sync_token;
        if !sync_token.is_empty() && &token == sync_token {
            return Ok(SyncCaller::Plugin);
        }

        let claims = verify_token(&token, &state.config.auth.jwt_secret)?;
        require_admin(state, &claims.sub).await?;
        Ok(SyncCaller::Admin(claims.sub))
    }
}
