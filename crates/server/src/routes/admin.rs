use axum::{
    extract::{Path, State},
    Json,
};
use shared::{AdminStats, ChatHistoryEntry, IntegrationSettings, RoleUpdate, UserWithRole};
use std::collections::HashMap;

use crate::{error::AppError, routes::guard::AdminUser, state::AppState};

/// Rows shown in the admin chat history
const CHAT_HISTORY_LIMIT: i64 = 100;
const UNNAMED_USER: &str = "نام تنظیم نشده";

/// GET /api/admin/stats
pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<AdminStats>, AppError> {
    let stats = AdminStats {
        total_users: state.db.count_profiles().await?,
        total_messages: state.db.count_chat_messages().await?,
        today_messages: state.db.count_chat_messages_today().await?,
        weekly_users: state.db.count_profiles_last_week().await?,
    };
    Ok(Json(stats))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserWithRole>>, AppError> {
    let profiles = state.db.list_profiles().await?;
    let roles: HashMap<String, String> = state
        .db
        .list_roles()
        .await?
        .into_iter()
        .map(|r| (r.user_id, r.role))
        .collect();

    let users = profiles
        .into_iter()
        .map(|p| {
            let role = roles
                .get(&p.id)
                .and_then(|r| r.parse().ok())
                .unwrap_or_default();
            UserWithRole {
                id: p.id,
                email: p.email,
                full_name: p.full_name,
                avatar_url: p.avatar_url,
                created_at: p.created_at,
                role,
            }
        })
        .collect();
    Ok(Json(users))
}

/// PUT /api/admin/users/:id/role
pub async fn update_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<String>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<UserWithRole>, AppError> {
    let profile = state
        .db
        .get_profile(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    state.db.set_role(&user_id, update.role).await?;
    tracing::info!(
        "Admin {} set role of {} to {}",
        admin.user_id,
        user_id,
        update.role.as_str()
    );

    Ok(Json(UserWithRole {
        id: profile.id,
        email: profile.email,
        full_name: profile.full_name,
        avatar_url: profile.avatar_url,
        created_at: profile.created_at,
        role: update.role,
    }))
}

/// GET /api/admin/chat-history
pub async fn chat_history(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<ChatHistoryEntry>>, AppError> {
    let messages = state.db.recent_chat_messages(CHAT_HISTORY_LIMIT).await?;
    let names: HashMap<String, String> = state
        .db
        .list_profiles()
        .await?
        .into_iter()
        .filter_map(|p| {
            let name = p.full_name.filter(|n| !n.trim().is_empty())?;
            Some((p.id, name))
        })
        .collect();

    let history = messages
        .into_iter()
        .map(|m| ChatHistoryEntry {
            user_name: names
                .get(&m.user_id)
                .cloned()
                .unwrap_or_else(|| UNNAMED_USER.to_string()),
            id: m.id,
            user_id: m.user_id,
            message: m.message,
            response: m.response,
            session_id: m.session_id,
            created_at: m.created_at,
        })
        .collect();
    Ok(Json(history))
}

/// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<IntegrationSettings>, AppError> {
    Ok(Json(state.db.get_integration_settings().await?))
}

/// PUT /api/admin/settings
pub async fn save_settings(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(settings): Json<IntegrationSettings>,
) -> Result<Json<IntegrationSettings>, AppError> {
    let settings = IntegrationSettings {
        wordpress_url: settings.wordpress_url.trim().to_string(),
        wordpress_api_key: settings.wordpress_api_key.trim().to_string(),
        wordpress_api_secret: settings.wordpress_api_secret.trim().to_string(),
    };
    state.db.save_integration_settings(&settings).await?;
    tracing::info!("Admin {} updated integration settings", admin.user_id);
    Ok(Json(settings))
}

#[cfg(test)]
mod tests {
    use crate::db::ChatMessageRow;
    use crate::routes::testing::{json_request, register, send, test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use shared::Role;
    use super::UNNAMED_USER;

    #[tokio::test]
    async fn test_admin_routes_reject_regular_users() {
        let (app, _) = test_app().await;
        let (token, _) = register(&app, "user@example.com").await;

        for uri in ["/api/admin/stats", "/api/admin/users", "/api/admin/chat-history", "/api/admin/settings"] {
            let (status, body) = send(&app, json_request("GET", uri, Some(&token), json!(null))).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
            assert_eq!(body["error"], "Admin access required");
        }

        let (status, _) = send(&app, json_request("GET", "/api/admin/stats", None, json!(null))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let (app, state) = test_app().await;
        let (admin, _) = register(&app, "admin@example.com").await;
        let (_, user_id) = register(&app, "user@example.com").await;

        for i in 0..3 {
            state
                .db
                .save_chat_message(&ChatMessageRow {
                    id: format!("m{}", i),
                    user_id: user_id.clone(),
                    message: "سلام".to_string(),
                    response: None,
                    session_id: None,
                    created_at: None,
                })
                .await
                .unwrap();
        }

        let (status, body) = send(&app, json_request("GET", "/api/admin/stats", Some(&admin), json!(null))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "total_users": 2, "total_messages": 3, "today_messages": 3, "weekly_users": 2 })
        );
    }

    #[tokio::test]
    async fn test_role_update_last_write_wins() {
        let (app, state) = test_app().await;
        let (admin, _) = register(&app, "admin@example.com").await;
        let (_, user_id) = register(&app, "user@example.com").await;
        let uri = format!("/api/admin/users/{}/role", user_id);

        let (status, body) = send(&app, json_request("PUT", &uri, Some(&admin), json!({ "role": "admin" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "admin");
        let (status, _) = send(&app, json_request("PUT", &uri, Some(&admin), json!({ "role": "user" }))).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(state.db.get_role(&user_id).await.unwrap(), Role::User);
        let rows = state.db.list_roles().await.unwrap();
        assert_eq!(rows.iter().filter(|r| r.user_id == user_id).count(), 1);

        let (_, users) = send(&app, json_request("GET", "/api/admin/users", Some(&admin), json!(null))).await;
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 2);
        let user = users.iter().find(|u| u["id"] == user_id.as_str()).unwrap();
        assert_eq!(user["role"], "user");
    }

    #[tokio::test]
    async fn test_role_update_validation() {
        let (app, _) = test_app().await;
        let (admin, _) = register(&app, "admin@example.com").await;

        let (status, _) = send(
            &app,
            json_request("PUT", "/api/admin/users/missing/role", Some(&admin), json!({ "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, user_id) = register(&app, "user@example.com").await;
        let uri = format!("/api/admin/users/{}/role", user_id);
        let (status, _) = send(&app, json_request("PUT", &uri, Some(&admin), json!({ "role": "owner" }))).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_chat_history_names_users() {
        let (app, state) = test_app().await;
        let (admin, _) = register(&app, "admin@example.com").await;
        let (user_token, user_id) = register(&app, "user@example.com").await;
        send(&app, json_request("PUT", "/auth/profile", Some(&user_token), json!({ "full_name": "نگار" }))).await;

        state
            .db
            .save_chat_message(&ChatMessageRow {
                id: "m1".to_string(),
                user_id: user_id.clone(),
                message: "سلام".to_string(),
                response: Some("درود".to_string()),
                session_id: Some("s1".to_string()),
                created_at: None,
            })
            .await
            .unwrap();
        let (_, quiet_id) = register(&app, "quiet@example.com").await;
        state
            .db
            .save_chat_message(&ChatMessageRow {
                id: "m2".to_string(),
                user_id: quiet_id,
                message: "؟".to_string(),
                response: None,
                session_id: None,
                created_at: None,
            })
            .await
            .unwrap();

        let (status, body) = send(&app, json_request("GET", "/api/admin/chat-history", Some(&admin), json!(null))).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        let named = rows.iter().find(|r| r["id"] == "m1").unwrap();
        assert_eq!(named["user_name"], "نگار");
        assert_eq!(named["response"], "درود");
        let unnamed = rows.iter().find(|r| r["id"] == "m2").unwrap();
        assert_eq!(unnamed["user_name"], UNNAMED_USER);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (app, _) = test_app().await;
        let (admin, _) = register(&app, "admin@example.com").await;

        let (_, body) = send(&app, json_request("GET", "/api/admin/settings", Some(&admin), json!(null))).await;
        assert_eq!(body["wordpress_url"], "");

        let update = json!({
            "wordpress_url": " https://shop.example ",
            "wordpress_api_key": "ck_1",
            "wordpress_api_secret": "cs_1"
        });
        let (status, _) = send(&app, json_request("PUT", "/api/admin/settings", Some(&admin), update)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, json_request("GET", "/api/admin/settings", Some(&admin), json!(null))).await;
        assert_eq!(body["wordpress_url"], "https://shop.example");
        assert_eq!(body["wordpress_api_secret"], "cs_1");
    }
}
