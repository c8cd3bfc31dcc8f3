//! Mirrored WooCommerce catalog: filtering, pricing and card views

use serde::{Deserialize, Serialize};

use crate::coach::ChatOutcome;
use crate::persian::{format_discount, format_price, product_cta, product_type_label};

pub const DEFAULT_FEATURED_LIMIT: usize = 3;

/// Categories used when nothing matches a recommendation
const GENERAL_CATEGORIES: [&str; 2] = ["توسعه فردی", "آموزش"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub woocommerce_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    pub regular_price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub status: String,
    pub in_stock: bool,
    #[serde(default)]
    pub product_type: Option<String>,
}

impl Product {
    pub fn has_discount(&self) -> bool {
        matches!(self.sale_price, Some(sale) if sale < self.regular_price)
    }

    pub fn display_price(&self) -> f64 {
        self.sale_price.unwrap_or(self.price)
    }

    /// Rounded percentage off the regular price, 0 when not discounted
    pub fn discount_percent(&self) -> u32 {
        match self.sale_price {
            Some(sale) if self.has_discount() && self.regular_price > 0.0 => {
                (((self.regular_price - sale) / self.regular_price) * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    fn mentions(&self, keyword: &str) -> bool {
        self.name.contains(keyword) || self.categories.iter().any(|c| c.contains(keyword))
    }
}

/// Published products, newest first, as returned by the store endpoint
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn in_stock(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.in_stock)
    }

    pub fn featured(&self, limit: usize) -> Vec<&Product> {
        self.in_stock().take(limit).collect()
    }

    /// Every course is a catalog product; the listing only hides sold-out ones
    pub fn courses(&self) -> Vec<&Product> {
        self.in_stock().collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        self.in_stock().filter(|p| p.in_category(category)).collect()
    }

    pub fn by_type(&self, product_type: &str) -> Vec<&Product> {
        self.in_stock()
            .filter(|p| p.product_type.as_deref() == Some(product_type))
            .collect()
    }

    /// Products to suggest after a chat outcome, falling back to general
    /// development products and then to anything in stock
    pub fn recommend(
        &self,
        outcome: Option<ChatOutcome>,
        product_type: Option<&str>,
        limit: usize,
    ) -> Vec<&Product> {
        let mut picked: Vec<&Product> = self
            .in_stock()
            .filter(|p| product_type.map_or(true, |t| p.product_type.as_deref() == Some(t)))
            .filter(|p| match outcome {
                Some(outcome) => outcome.keywords().iter().any(|k| p.mentions(k)),
                None => true,
            })
            .collect();

        if picked.is_empty() {
            picked = self
                .in_stock()
                .filter(|p| GENERAL_CATEGORIES.iter().any(|c| p.in_category(c)))
                .collect();
        }
        if picked.is_empty() {
            picked = self.in_stock().collect();
        }

        picked.truncate(limit);
        picked
    }
}

/// Text-ready view of a product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub title: String,
    pub summary: Option<String>,
    pub price_label: String,
    pub regular_price_label: Option<String>,
    pub discount_label: Option<String>,
    pub type_label: Option<String>,
    pub categories: Vec<String>,
    pub cta: String,
    pub url: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        let discounted = product.has_discount();
        let product_type = product.product_type.as_deref().unwrap_or_default();
        Self {
            title: product.name.clone(),
            summary: product
                .short_description
                .as_ref()
                .filter(|s| !s.trim().is_empty())
                .cloned(),
            price_label: format_price(product.display_price()),
            regular_price_label: discounted.then(|| format_price(product.regular_price)),
            discount_label: discounted.then(|| format_discount(product.discount_percent())),
            type_label: product
                .product_type
                .as_deref()
                .map(|t| product_type_label(t).to_string()),
            categories: product.categories.clone(),
            cta: product_cta(product_type, product.display_price()).to_string(),
            url: product.product_url.clone(),
            in_stock: product.in_stock,
        }
    }
}

impl ProductCard {
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        match &self.type_label {
            Some(kind) => lines.push(format!("{} [{}]", self.title, kind)),
            None => lines.push(self.title.clone()),
        }
        if let Some(summary) = &self.summary {
            lines.push(format!("  {}", summary));
        }
        if !self.categories.is_empty() {
            lines.push(format!("  {}", self.categories.join("، ")));
        }
        lines.push(format!("  {}", self.price_line()));
        if !self.in_stock {
            lines.push("  ناموجود".to_string());
        }
        match &self.url {
            Some(url) => lines.push(format!("  {}: {}", self.cta, url)),
            None => lines.push(format!("  {}", self.cta)),
        }
        lines.join("\n")
    }

    pub fn render_compact(&self) -> String {
        match &self.url {
            Some(url) => format!("{} | {} | {}", self.title, self.price_line(), url),
            None => format!("{} | {}", self.title, self.price_line()),
        }
    }

    fn price_line(&self) -> String {
        match (&self.regular_price_label, &self.discount_label) {
            (Some(regular), Some(discount)) => {
                format!("{} (به جای {}، {})", self.price_label, regular, discount)
            }
            _ => self.price_label.clone(),
        }
    }
}
