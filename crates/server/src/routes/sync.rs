//! WordPress / WooCommerce sync function
//!
//! One endpoint, dispatched on `action`. Every branch answers with its own
//! status and JSON body; only unexpected failures fall through to a bare
//! `{error}` with 500.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::SyncRequest;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    routes::{auth::create_account, guard::SyncCaller},
    state::AppState,
    wordpress::{NewWpUser, WordPressClient, WordPressError},
};

type SyncResponse = (StatusCode, Json<Value>);

const DEFAULT_ACTION: &str = "test_connection";

fn reply(status: StatusCode, body: Value) -> SyncResponse {
    (status, Json(body))
}

/// GET /functions/wordpress-sync?action=...
pub async fn wordpress_sync_query(
    State(state): State<AppState>,
    caller: SyncCaller,
    Query(params): Query<HashMap<String, String>>,
) -> SyncResponse {
    let action = params
        .get("action")
        .cloned()
        .unwrap_or_else(|| DEFAULT_ACTION.to_string());
    let data = serde_json::to_value(&params).unwrap_or_default();
    dispatch(&state, &caller, &action, data).await
}

/// POST /functions/wordpress-sync
pub async fn wordpress_sync(
    State(state): State<AppState>,
    caller: SyncCaller,
    headers: HeaderMap,
    body: Bytes,
) -> SyncResponse {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        return dispatch(&state, &caller, DEFAULT_ACTION, Value::Null).await;
    }

    match serde_json::from_slice::<SyncRequest>(&body) {
        Ok(request) => {
            let data = request.data.unwrap_or(Value::Null);
            dispatch(&state, &caller, &request.action, data).await
        }
        Err(e) => {
            tracing::error!("Unreadable sync request: {}", e);
            reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
        }
    }
}

async fn dispatch(state: &AppState, caller: &SyncCaller, action: &str, data: Value) -> SyncResponse {
    match caller {
        SyncCaller::Plugin => tracing::info!("WordPress sync action {} from plugin", action),
        SyncCaller::Admin(user_id) => {
            tracing::info!("WordPress sync action {} from admin {}", action, user_id)
        }
    }

    let result = match action {
        "test_connection" => test_connection(state, &data).await,
        "sync_wordpress_user_to_supabase" => pull_wordpress_user(state, data).await,
        "sync_supabase_user_to_wordpress" => push_user_to_wordpress(state, data).await,
        "get_sync_status" => get_sync_status(state, &data).await,
        "sync_woocommerce_products" => Ok(sync_woocommerce_products(state).await),
        "test_products_connection" => Ok(test_products_connection(state).await),
        _ => Ok(reply(StatusCode::BAD_REQUEST, json!({ "error": "Invalid action" }))),
    };

    result.unwrap_or_else(|e| {
        tracing::error!("WordPress sync action {} failed: {:#}", action, e);
        reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
    })
}

fn non_empty_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

async fn test_connection(state: &AppState, data: &Value) -> anyhow::Result<SyncResponse> {
    let stored = state.db.get_integration_settings().await?;
    let url = non_empty_str(data, "wordpress_url").unwrap_or(&stored.wordpress_url);
    let key = non_empty_str(data, "wordpress_api_key").unwrap_or(&stored.wordpress_api_key);
    let secret =
        non_empty_str(data, "wordpress_api_secret").unwrap_or(&stored.wordpress_api_secret);

    if url.is_empty() || key.is_empty() || secret.is_empty() {
        return Ok(reply(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": "WordPress credentials not provided" }),
        ));
    }

    let client = WordPressClient::new(state.http.clone(), url, key, secret);
    let response = match client.current_user().await {
        Ok(user) => reply(
            StatusCode::OK,
            json!({
                "success": true,
                "message": "Connection successful",
                "wordpress_user": {
                    "id": user.id,
                    "username": user.username,
                    "name": user.name,
                },
            }),
        ),
        Err(WordPressError::Status { status, body, .. }) => reply(
            StatusCode::BAD_REQUEST,
            json!({
                "success": false,
                "error": format!("WordPress API error: {} - {}", status, body),
            }),
        ),
        Err(e) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": format!("Connection failed: {}", e) }),
        ),
    };
    Ok(response)
}

/// User record pushed by the WordPress plugin
#[derive(Debug, Deserialize)]
struct WordPressUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

async fn pull_wordpress_user(state: &AppState, data: Value) -> anyhow::Result<SyncResponse> {
    let wp_user: WordPressUser =
        serde_json::from_value(data).context("Invalid WordPress user payload")?;
    let email = wp_user.email.trim().to_lowercase();
    let display_name = wp_user
        .display_name
        .as_deref()
        .filter(|n| !n.trim().is_empty());
    let username = wp_user.username.as_deref();

    if let Some(existing) = state.db.get_profile_by_email(&email).await? {
        if let Err(e) = state
            .db
            .link_wordpress_user(&existing.id, wp_user.id, username, display_name, "wordpress")
            .await
        {
            tracing::error!("Failed to update profile {}: {}", existing.id, e);
            return Ok(reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to update existing user" }),
            ));
        }
        tracing::info!("Linked WordPress user {} to {}", wp_user.id, existing.id);
        return Ok(reply(
            StatusCode::OK,
            json!({ "success": true, "action": "updated", "user_id": existing.id }),
        ));
    }

    // The account is only reachable through a password reset
    let password = Uuid::new_v4().to_string();
    let full_name = display_name.map(str::to_string);
    let user_id = match create_account(state, &email, &password, full_name).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to create account for {}: {}", email, e);
            return Ok(reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to create auth user" }),
            ));
        }
    };

    if let Err(e) = state
        .db
        .link_wordpress_user(&user_id, wp_user.id, username, None, "wordpress")
        .await
    {
        tracing::error!("Failed to link WordPress user {}: {}", wp_user.id, e);
    }

    Ok(reply(
        StatusCode::OK,
        json!({ "success": true, "action": "created", "user_id": user_id }),
    ))
}

#[derive(Debug, Deserialize)]
struct LocalUser {
    id: String,
    email: String,
    #[serde(default)]
    full_name: Option<String>,
}

/// Username for a pushed account, unique per millisecond
fn wordpress_username(email: &str, now_ms: i64) -> String {
    let local_part = email.split('@').next().unwrap_or_default();
    format!("{}_{}", local_part, now_ms)
}

async fn push_user_to_wordpress(state: &AppState, data: Value) -> anyhow::Result<SyncResponse> {
    let user: LocalUser = serde_json::from_value(data).context("Invalid user payload")?;
    let settings = state.db.get_integration_settings().await?;
    if settings.wordpress_url.is_empty() || settings.wordpress_api_key.is_empty() {
        return Ok(reply(
            StatusCode::BAD_REQUEST,
            json!({ "error": "WordPress API credentials not configured" }),
        ));
    }

    let client = WordPressClient::new(
        state.http.clone(),
        &settings.wordpress_url,
        &settings.wordpress_api_key,
        &settings.wordpress_api_secret,
    );
    let new_user = NewWpUser {
        username: wordpress_username(&user.email, Utc::now().timestamp_millis()),
        email: user.email.clone(),
        name: user
            .full_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "User".to_string()),
        password: Uuid::new_v4().to_string(),
        roles: vec!["customer".to_string()],
    };

    let created = match client.create_user(&new_user).await {
        Ok(created) => created,
        Err(e) => {
            tracing::error!("Failed to create WordPress user for {}: {}", user.email, e);
            return Ok(reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to create WordPress user" }),
            ));
        }
    };

    let username = created.username.as_deref().or(Some(new_user.username.as_str()));
    if let Err(e) = state
        .db
        .link_wordpress_user(&user.id, created.id, username, None, "supabase")
        .await
    {
        tracing::error!("Failed to record WordPress id for {}: {}", user.id, e);
    }

    Ok(reply(
        StatusCode::OK,
        json!({ "success": true, "wordpress_user_id": created.id }),
    ))
}

async fn get_sync_status(state: &AppState, data: &Value) -> anyhow::Result<SyncResponse> {
    let profile = match non_empty_str(data, "user_id") {
        Some(user_id) => state.db.get_profile(user_id).await?,
        None => None,
    };
    let sync_status = profile.map(|p| {
        json!({
            "is_synced": p.wordpress_user_id.is_some(),
            "wordpress_user_id": p.wordpress_user_id,
            "wordpress_username": p.wordpress_username,
            "sync_source": p.sync_source,
            "last_synced_at": p.last_synced_at,
        })
    });
    Ok(reply(
        StatusCode::OK,
        json!({ "success": true, "sync_status": sync_status }),
    ))
}

#[derive(Debug, Serialize)]
struct ProductSyncResult {
    product_id: i64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProductSyncReport {
    message: String,
    total_products: usize,
    successful_syncs: usize,
    failed_syncs: usize,
    sync_results: Vec<ProductSyncResult>,
}

async fn mirror_products(state: &AppState) -> anyhow::Result<ProductSyncReport> {
    let settings = state.db.get_integration_settings().await?;
    let client = WordPressClient::from_settings(state.http.clone(), &settings)?;
    let products = client.published_products().await?;
    tracing::info!("Fetched {} WooCommerce products", products.len());

    let mut sync_results = Vec::with_capacity(products.len());
    for product in &products {
        let result = match state.db.upsert_product(&product.to_row()).await {
            Ok(()) => ProductSyncResult {
                product_id: product.id,
                status: "success",
                error: None,
            },
            Err(e) => {
                tracing::warn!("Failed to mirror product {}: {}", product.id, e);
                ProductSyncResult {
                    product_id: product.id,
                    status: "error",
                    error: Some(e.to_string()),
                }
            }
        };
        sync_results.push(result);
    }

    let successful_syncs = sync_results.iter().filter(|r| r.error.is_none()).count();
    Ok(ProductSyncReport {
        message: "WooCommerce products sync completed".to_string(),
        total_products: products.len(),
        successful_syncs,
        failed_syncs: sync_results.len() - successful_syncs,
        sync_results,
    })
}

async fn sync_woocommerce_products(state: &AppState) -> SyncResponse {
    match mirror_products(state).await {
        Ok(report) => {
            tracing::info!(
                "Product sync finished: {} ok, {} failed",
                report.successful_syncs,
                report.failed_syncs
            );
            reply(StatusCode::OK, json!(report))
        }
        Err(e) => {
            tracing::error!("Product sync failed: {}", e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to sync WooCommerce products", "details": e.to_string() }),
            )
        }
    }
}

async fn test_products_connection(state: &AppState) -> SyncResponse {
    let probe = async {
        let settings = state.db.get_integration_settings().await?;
        let client = WordPressClient::from_settings(state.http.clone(), &settings)?;
        anyhow::Ok(client.sample_products_count().await?)
    };

    match probe.await {
        Ok(count) => reply(
            StatusCode::OK,
            json!({
                "success": true,
                "message": "WooCommerce products API connection successful",
                "sample_products_count": count,
            }),
        ),
        Err(e) => {
            tracing::error!("WooCommerce products probe failed: {}", e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "success": false,
                    "error": "Failed to test WooCommerce products connection",
                    "details": e.to_string(),
                }),
            )
        }
    }
}
