use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod admin;
mod auth;
mod catalog;
mod guard;
mod health;
mod proxy;
mod sync;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        // Password reset
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        // Catalog and chat log
        .route("/api/products", get(catalog::list_products))
        .route("/api/chat/messages", post(catalog::log_chat_message))
        // Admin panel
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id/role", put(admin::update_role))
        .route("/api/admin/chat-history", get(admin::chat_history))
        .route(
            "/api/admin/settings",
            get(admin::get_settings).put(admin::save_settings),
        )
        // Functions
        .route("/functions/ai-coach-proxy", post(proxy::ai_coach_proxy))
        .route(
            "/functions/wordpress-sync",
            get(sync::wordpress_sync_query).post(sync::wordpress_sync),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub mod testing {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::create_router;
    use crate::{config::Config, db::Database, state::AppState};

    pub const TEST_PASSWORD: &str = "secret123";

    pub async fn test_state() -> AppState {
        let db = Database::in_memory().await.unwrap();

        let mut config = Config::default();
        config.auth.admin_emails = vec!["admin@example.com".to_string()];
        config.smtp.enabled = false;
        AppState::new(db, config)
    }

    pub async fn test_app() -> (Router, AppState) {
        let state = test_state().await;
        (create_router(state.clone()), state)
    }

    /// Serve `router` on an ephemeral port and return its base URL
    pub async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = if body.is_null() {
            Body::empty()
        } else {
            Body::from(body.to_string())
        };
        builder.body(body).unwrap()
    }

    /// Run one request; empty bodies come back as null, non-JSON as a string
    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    /// Register `email` with the test password, returning (token, user_id)
    pub async fn register(app: &Router, email: &str) -> (String, String) {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/auth/register",
                None,
                json!({ "email": email, "password": TEST_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user_id"].as_str().unwrap().to_string(),
        )
    }
}
