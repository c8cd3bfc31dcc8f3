use shared::Product;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub wordpress_user_id: Option<i64>,
    pub wordpress_username: Option<String>,
    pub sync_source: Option<String>,
    pub last_synced_at: Option<String>,
    pub created_at: Option<String>,
}

impl Profile {
    pub fn new(id: &str, email: &str, full_name: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            full_name,
            avatar_url: None,
            wordpress_user_id: None,
            wordpress_username: None,
            sync_source: None,
            last_synced_at: None,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRole {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageRow {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: Option<String>,
    pub session_id: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct IntegrationSetting {
    pub setting_key: String,
    pub setting_value: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: String,
    pub woocommerce_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub regular_price: f64,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    /// JSON array of category names
    pub categories: String,
    pub status: String,
    pub in_stock: bool,
    pub product_type: Option<String>,
    pub last_synced_at: Option<String>,
    pub created_at: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let categories = serde_json::from_str(&row.categories).unwrap_or_else(|e| {
            tracing::warn!("Bad categories for product {}: {}", row.woocommerce_id, e);
            Vec::new()
        });
        Product {
            id: row.id,
            woocommerce_id: row.woocommerce_id,
            name: row.name,
            description: row.description,
            short_description: row.short_description,
            price: row.price,
            sale_price: row.sale_price,
            regular_price: row.regular_price,
            image_url: row.image_url,
            product_url: row.product_url,
            categories,
            status: row.status,
            in_stock: row.in_stock,
            product_type: row.product_type,
        }
    }
}
