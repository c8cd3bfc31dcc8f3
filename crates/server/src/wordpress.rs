//! WordPress REST / WooCommerce client and the product mirror mapping

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use shared::IntegrationSettings;
use std::sync::LazyLock;
use thiserror::Error;

use crate::db::ProductRow;

/// WooCommerce caps `per_page` at 100 and the mirror does not paginate
pub const PRODUCT_PAGE_SIZE: u32 = 100;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag pattern is valid"));

#[derive(Debug, Error)]
pub enum WordPressError {
    #[error("WordPress API credentials not configured")]
    MissingCredentials,

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{api} API error: {status} {reason}")]
    Status {
        api: &'static str,
        status: u16,
        reason: String,
        body: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpCurrentUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewWpUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpCreatedUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooImage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub src: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooCategory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooProduct {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sale_price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub regular_price: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<WooImage>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<WooCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock_status: String,
}

/// Explicit `null` reads as the empty value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// WooCommerce sends prices as strings, some plugins as numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected price, got {}", other))),
    }
}

pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

impl WooProduct {
    /// Mirror row for this product; `id` is only used when the row is new
    pub fn to_row(&self) -> ProductRow {
        let categories: Vec<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        ProductRow {
            id: uuid::Uuid::new_v4().to_string(),
            woocommerce_id: self.id,
            name: self.name.clone(),
            description: Some(self.description.as_deref().map(strip_html).unwrap_or_default()),
            short_description: Some(
                self.short_description
                    .as_deref()
                    .map(strip_html)
                    .unwrap_or_default(),
            ),
            price: parse_price(&self.price).unwrap_or(0.0),
            sale_price: parse_price(&self.sale_price),
            regular_price: parse_price(&self.regular_price).unwrap_or(0.0),
            image_url: self
                .images
                .first()
                .map(|i| i.src.clone())
                .filter(|src| !src.is_empty()),
            product_url: self.permalink.clone(),
            categories: serde_json::to_string(&categories).unwrap_or_else(|_| "[]".to_string()),
            status: self.status.clone(),
            in_stock: self.stock_status == "instock",
            product_type: None,
            last_synced_at: Some(chrono::Utc::now().to_rfc3339()),
            created_at: None,
        }
    }
}

#[derive(Clone)]
pub struct WordPressClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl WordPressClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str, api_secret: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// Client for the product endpoints, which need all three credentials
    pub fn from_settings(
        http: reqwest::Client,
        settings: &IntegrationSettings,
    ) -> Result<Self, WordPressError> {
        if !settings.is_complete() {
            return Err(WordPressError::MissingCredentials);
        }
        Ok(Self::new(
            http,
            &settings.wordpress_url,
            &settings.wordpress_api_key,
            &settings.wordpress_api_secret,
        ))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.api_key, Some(&self.api_secret))
    }

    async fn checked(
        api: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, WordPressError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("{} API returned {}: {}", api, status, body);
        Err(WordPressError::Status {
            api,
            status: status.as_u16(),
            reason,
            body,
        })
    }

    /// GET /wp-json/wp/v2/users/me
    pub async fn current_user(&self) -> Result<WpCurrentUser, WordPressError> {
        let response = self.get("/wp-json/wp/v2/users/me").send().await?;
        let user = Self::checked("WordPress", response).await?.json().await?;
        Ok(user)
    }

    /// POST /wp-json/wp/v2/users
    pub async fn create_user(&self, user: &NewWpUser) -> Result<WpCreatedUser, WordPressError> {
        let response = self
            .http
            .post(format!("{}/wp-json/wp/v2/users", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(user)
            .send()
            .await?;
        let created = Self::checked("WordPress", response).await?.json().await?;
        Ok(created)
    }

    /// Published products, first page only
    pub async fn published_products(&self) -> Result<Vec<WooProduct>, WordPressError> {
        let path = format!(
            "/wp-json/wc/v3/products?per_page={}&status=publish",
            PRODUCT_PAGE_SIZE
        );
        let response = self.get(&path).send().await?;
        let products = Self::checked("WooCommerce", response).await?.json().await?;
        Ok(products)
    }

    /// Size of a one-product probe of the products endpoint
    pub async fn sample_products_count(&self) -> Result<usize, WordPressError> {
        let response = self.get("/wp-json/wc/v3/products?per_page=1").send().await?;
        let body: Value = Self::checked("WooCommerce", response).await?.json().await?;
        Ok(body.as_array().map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::spawn_upstream;
    use axum::{http::HeaderMap, routing::get, Json, Router};
    use serde_json::json;

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>دوره <strong>کوچینگ</strong></p>\n"), "دوره کوچینگ\n");
        assert_eq!(strip_html("no tags"), "no tags");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("120000"), Some(120000.0));
        assert_eq!(parse_price(" 9.5 "), Some(9.5));
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("abc"), None);
    }

    #[test]
    fn test_product_mapping() {
        let product: WooProduct = serde_json::from_value(json!({
            "id": 17,
            "name": "دوره کوچینگ",
            "description": "<p>شرح</p>",
            "short_description": null,
            "price": "150000",
            "sale_price": "",
            "regular_price": 200000,
            "images": [{ "src": "https://shop.example/a.jpg" }, { "src": "https://shop.example/b.jpg" }],
            "permalink": "https://shop.example/p/17",
            "categories": [{ "name": "کوچینگ" }, { "name": "آموزش" }],
            "status": "publish",
            "stock_status": "outofstock"
        }))
        .unwrap();

        let row = product.to_row();
        assert_eq!(row.woocommerce_id, 17);
        assert_eq!(row.description.as_deref(), Some("شرح"));
        assert_eq!(row.short_description.as_deref(), Some(""));
        assert_eq!(row.price, 150000.0);
        assert_eq!(row.sale_price, None);
        assert_eq!(row.regular_price, 200000.0);
        assert_eq!(row.image_url.as_deref(), Some("https://shop.example/a.jpg"));
        assert_eq!(row.categories, r#"["کوچینگ","آموزش"]"#);
        assert!(!row.in_stock);
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let product: WooProduct = serde_json::from_value(json!({
            "id": 5,
            "name": null,
            "images": null,
            "categories": [{ "name": null }],
            "status": null,
            "stock_status": null
        }))
        .unwrap();
        let row = product.to_row();
        assert_eq!(row.name, "");
        assert_eq!(row.image_url, None);
        assert_eq!(row.categories, r#"[""]"#);
        assert!(!row.in_stock);
    }

    #[test]
    fn test_from_settings_requires_all_credentials() {
        let settings = IntegrationSettings {
            wordpress_url: "https://shop.example".into(),
            wordpress_api_key: "ck".into(),
            wordpress_api_secret: String::new(),
        };
        let err = WordPressClient::from_settings(reqwest::Client::new(), &settings)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "WordPress API credentials not configured");
    }

    #[tokio::test]
    async fn test_current_user_sends_basic_auth() {
        let upstream = Router::new().route(
            "/wp-json/wp/v2/users/me",
            get(|headers: HeaderMap| async move {
                // "ck:cs" in base64
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Basic Y2s6Y3M=");
                let id = if authorized { 1 } else { 0 };
                Json(json!({ "id": id, "username": "admin", "name": "Admin" }))
            }),
        );
        let base = spawn_upstream(upstream).await;

        let client = WordPressClient::new(reqwest::Client::new(), &format!("{}/", base), "ck", "cs");
        let user = client.current_user().await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_status_error_carries_body() {
        let upstream = Router::new().route(
            "/wp-json/wc/v3/products",
            get(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base = spawn_upstream(upstream).await;

        let client = WordPressClient::new(reqwest::Client::new(), &base, "ck", "cs");
        match client.sample_products_count().await {
            Err(WordPressError::Status { status, body, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }
}
