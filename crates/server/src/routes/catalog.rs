use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Catalog, ChatLogEntry, Product};
use uuid::Uuid;

use crate::{
    db::ChatMessageRow,
    error::AppError,
    routes::guard::AuthUser,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    /// Number of featured products to return
    pub featured: Option<usize>,
}

/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let rows = state.db.list_published_products().await?;
    let catalog = Catalog::new(rows.into_iter().map(Product::from).collect());

    let picked = if let Some(limit) = query.featured {
        catalog.featured(limit)
    } else if let Some(category) = query.category.as_deref() {
        catalog.by_category(category)
    } else if let Some(product_type) = query.product_type.as_deref() {
        catalog.by_type(product_type)
    } else {
        catalog.all().iter().collect()
    };
    Ok(Json(picked.into_iter().cloned().collect()))
}

/// POST /api/chat/messages
pub async fn log_chat_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(entry): Json<ChatLogEntry>,
) -> Result<StatusCode, AppError> {
    if entry.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is empty".to_string()));
    }

    let row = ChatMessageRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.user_id,
        message: entry.message,
        response: entry.response,
        session_id: entry.session_id,
        created_at: None,
    };
    state.db.save_chat_message(&row).await?;
    tracing::debug!("Logged chat message {} for {}", row.id, row.user_id);
    Ok(StatusCode::CREATED)
}
