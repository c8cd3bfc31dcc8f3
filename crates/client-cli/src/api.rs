//! HTTP client for the coaching server
//!
//! The caller's identity is an explicit [`Session`] owned by the client; no
//! request reads credentials from anywhere else.

use anyhow::{anyhow, bail, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use shared::{
    AdminStats, AuthResponse, ChatHistoryEntry, ChatLogEntry, ChatProxyRequest,
    ForgotPasswordRequest, IntegrationSettings, LoginRequest, MeResponse, Product, ProfileUpdate,
    RegisterRequest, ResetPasswordRequest, Role, RoleUpdate, SyncRequest, UserWithRole,
};

/// Who the client is acting as
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }
}

/// Filters for the store listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<usize>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn signed_in(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if !self.session.is_signed_in() {
            bail!("Not logged in. Run 'coach login' first.");
        }
        Ok(self.request(method, path))
    }

    // Auth

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response = self.request(Method::POST, "/auth/register").json(request).send().await?;
        decode(response).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let response = self.request(Method::POST, "/auth/login").json(request).send().await?;
        decode(response).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let request = ForgotPasswordRequest {
            email: email.to_string(),
        };
        let response = self
            .request(Method::POST, "/auth/forgot-password")
            .json(&request)
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<()> {
        let response = self
            .request(Method::POST, "/auth/reset-password")
            .json(request)
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn me(&self) -> Result<MeResponse> {
        let response = self.signed_in(Method::GET, "/auth/me")?.send().await?;
        decode(response).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<MeResponse> {
        let response = self
            .signed_in(Method::PUT, "/auth/profile")?
            .json(update)
            .send()
            .await?;
        decode(response).await
    }

    // Catalog and chat

    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let response = self
            .signed_in(Method::GET, "/api/products")?
            .query(filter)
            .send()
            .await?;
        decode(response).await
    }

    /// The proxy answers every chat request with a renderable body, whatever
    /// its status code
    pub async fn chat(&self, request: &ChatProxyRequest) -> Result<Value> {
        let response = self
            .request(Method::POST, "/functions/ai-coach-proxy")
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| {
            tracing::debug!("Non-JSON chat reply with status {}", status);
            json!([{ "output": body }])
        }))
    }

    pub async fn log_chat(&self, entry: &ChatLogEntry) -> Result<()> {
        let response = self
            .signed_in(Method::POST, "/api/chat/messages")?
            .json(entry)
            .send()
            .await?;
        expect_success(response).await
    }

    // Admin

    pub async fn admin_stats(&self) -> Result<AdminStats> {
        let response = self.signed_in(Method::GET, "/api/admin/stats")?.send().await?;
        decode(response).await
    }

    pub async fn admin_users(&self) -> Result<Vec<UserWithRole>> {
        let response = self.signed_in(Method::GET, "/api/admin/users")?.send().await?;
        decode(response).await
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> Result<UserWithRole> {
        let response = self
            .signed_in(Method::PUT, &format!("/api/admin/users/{}/role", user_id))?
            .json(&RoleUpdate { role })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn chat_history(&self) -> Result<Vec<ChatHistoryEntry>> {
        let response = self
            .signed_in(Method::GET, "/api/admin/chat-history")?
            .send()
            .await?;
        decode(response).await
    }

    pub async fn settings(&self) -> Result<IntegrationSettings> {
        let response = self.signed_in(Method::GET, "/api/admin/settings")?.send().await?;
        decode(response).await
    }

    pub async fn save_settings(&self, settings: &IntegrationSettings) -> Result<IntegrationSettings> {
        let response = self
            .signed_in(Method::PUT, "/api/admin/settings")?
            .json(settings)
            .send()
            .await?;
        decode(response).await
    }

    /// Run a sync action; the body is returned as-is for any status since
    /// every action reports its own outcome
    pub async fn sync(&self, action: &str, data: Option<Value>) -> Result<(u16, Value)> {
        let request = SyncRequest {
            action: action.to_string(),
            data,
        };
        let response = self
            .signed_in(Method::POST, "/functions/wordpress-sync")?
            .json(&request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

/// Message carried by an error body, or the status line
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("Server returned {}", status))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(anyhow!(error_message(status, &body)));
    }
    serde_json::from_str(&body).map_err(|e| anyhow!("Unexpected response from server: {}", e))
}

async fn expect_success(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!(error_message(status, &body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(StatusCode::FORBIDDEN, r#"{"error":"Admin access required"}"#),
            "Admin access required"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "<html>"), "Server returned 502 Bad Gateway");
    }

    #[tokio::test]
    async fn test_requests_carry_session_token() {
        let server = Router::new().route(
            "/api/products",
            get(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Bearer jwt-1");
                assert_eq!(params.get("type").map(String::as_str), Some("course"));
                assert!(!params.contains_key("category"));
                Json(json!([]))
            }),
        );
        let base = spawn(server).await;

        let client = ApiClient::new(&base, Session::with_token("jwt-1"));
        let filter = ProductFilter {
            product_type: Some("course".to_string()),
            ..Default::default()
        };
        assert!(client.products(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_products_load_into_resource() {
        let server = Router::new().route(
            "/api/products",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert!(params.is_empty());
                Json(json!([{
                    "id": "p1",
                    "woocommerce_id": 7,
                    "name": "دوره آموزشی",
                    "price": 100.0,
                    "regular_price": 100.0,
                    "status": "publish",
                    "in_stock": true,
                    "product_type": "course"
                }]))
            }),
        );
        let base = spawn(server).await;

        let client = ApiClient::new(&base, Session::with_token("jwt"));
        let filter = ProductFilter::default();
        let products = crate::resource::Resource::load(|| client.products(&filter))
            .await
            .into_result()
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].woocommerce_id, 7);
    }

    #[tokio::test]
    async fn test_anonymous_session_is_refused_locally() {
        let client = ApiClient::new("http://127.0.0.1:1", Session::anonymous());
        let err = client.admin_stats().await.unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_message() {
        let server = Router::new().route(
            "/api/admin/stats",
            get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "error": "Admin access required" }))) }),
        );
        let base = spawn(server).await;

        let client = ApiClient::new(&base, Session::with_token("jwt"));
        let err = client.admin_stats().await.unwrap_err();
        assert_eq!(err.to_string(), "Admin access required");
    }

    #[tokio::test]
    async fn test_chat_wraps_plain_text() {
        let server = Router::new().route("/functions/ai-coach-proxy", post(|| async { "سلام" }));
        let base = spawn(server).await;

        let client = ApiClient::new(&base, Session::anonymous());
        let request = ChatProxyRequest {
            message: "hi".to_string(),
            user_id: "u1".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };
        let body = client.chat(&request).await.unwrap();
        assert_eq!(body, json!([{ "output": "سلام" }]));
        assert_eq!(shared::coach::interpret_reply(&body).text, "سلام");
    }
}
