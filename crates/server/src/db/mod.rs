use anyhow::Result;
use shared::{IntegrationSettings, Role};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;

mod models;

pub use models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Fresh migrated database that lives as long as the pool's single connection
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY REFERENCES users(id),
                email TEXT UNIQUE NOT NULL,
                full_name TEXT,
                avatar_url TEXT,
                wordpress_user_id INTEGER,
                wordpress_username TEXT,
                sync_source TEXT,
                last_synced_at TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT PRIMARY KEY REFERENCES users(id),
                role TEXT NOT NULL DEFAULT 'user',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                message TEXT NOT NULL,
                response TEXT,
                session_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS integration_settings (
                setting_key TEXT PRIMARY KEY,
                setting_value TEXT NOT NULL DEFAULT '',
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS woocommerce_products (
                id TEXT PRIMARY KEY,
                woocommerce_id INTEGER UNIQUE NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                short_description TEXT,
                price REAL NOT NULL DEFAULT 0,
                sale_price REAL,
                regular_price REAL NOT NULL DEFAULT 0,
                image_url TEXT,
                product_url TEXT,
                categories TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'publish',
                in_stock BOOLEAN NOT NULL DEFAULT 1,
                product_type TEXT,
                last_synced_at TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    // Account operations

    /// Insert the login row, its profile and its role together
    pub async fn create_account(&self, user: &User, profile: &Profile, role: Role) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO profiles (id, email, full_name, avatar_url) VALUES (?, ?, ?, ?)")
            .bind(&profile.id)
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(&profile.avatar_url)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(&user.id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn update_user_password(&self, email: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE email = ?")
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Profile operations

    const PROFILE_COLUMNS: &'static str = "id, email, full_name, avatar_url, wordpress_user_id, \
        wordpress_username, sync_source, last_synced_at, created_at";

    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE id = ?", Self::PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE email = ?", Self::PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// Newest first
    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let sql = format!(
            "SELECT {} FROM profiles ORDER BY created_at DESC, rowid DESC",
            Self::PROFILE_COLUMNS
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    /// `None` fields keep their current value
    pub async fn update_profile(
        &self,
        id: &str,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE profiles SET full_name = COALESCE(?, full_name), avatar_url = COALESCE(?, avatar_url) WHERE id = ?",
        )
        .bind(full_name)
        .bind(avatar_url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the WordPress account a profile is linked to
    pub async fn link_wordpress_user(
        &self,
        id: &str,
        wordpress_user_id: i64,
        wordpress_username: Option<&str>,
        full_name: Option<&str>,
        sync_source: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                wordpress_user_id = ?,
                wordpress_username = ?,
                full_name = COALESCE(?, full_name),
                sync_source = ?,
                last_synced_at = ?
            WHERE id = ?
            "#,
        )
        .bind(wordpress_user_id)
        .bind(wordpress_username)
        .bind(full_name)
        .bind(sync_source)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_profiles(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_profiles_last_week(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM profiles WHERE created_at >= datetime('now', '-7 days')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // Role operations

    /// Effective role, `user` when no assignment exists
    pub async fn get_role(&self, user_id: &str) -> Result<Role> {
        let role = sqlx::query_scalar::<_, String>("SELECT role FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role.and_then(|r| r.parse().ok()).unwrap_or_default())
    }

    pub async fn list_roles(&self) -> Result<Vec<UserRole>> {
        let roles = sqlx::query_as::<_, UserRole>("SELECT user_id, role FROM user_roles")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    /// One row per user; the latest write wins
    pub async fn set_role(&self, user_id: &str, role: Role) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // Chat log operations

    pub async fn save_chat_message(&self, message: &ChatMessageRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, user_id, message, response, session_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.user_id)
        .bind(&message.message)
        .bind(&message.response)
        .bind(&message.session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_chat_messages(&self, limit: i64) -> Result<Vec<ChatMessageRow>> {
        let messages = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT id, user_id, message, response, session_id, created_at FROM chat_messages ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn count_chat_messages(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_chat_messages_today(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_messages WHERE created_at >= datetime('now', 'start of day')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // Integration settings

    pub async fn get_integration_settings(&self) -> Result<IntegrationSettings> {
        let rows = sqlx::query_as::<_, IntegrationSetting>(
            "SELECT setting_key, setting_value FROM integration_settings WHERE setting_key IN (?, ?, ?)",
        )
        .bind(IntegrationSettings::KEYS[0])
        .bind(IntegrationSettings::KEYS[1])
        .bind(IntegrationSettings::KEYS[2])
        .fetch_all(&self.pool)
        .await?;
        Ok(IntegrationSettings::from_pairs(
            rows.into_iter().map(|r| (r.setting_key, r.setting_value)),
        ))
    }

    /// Upsert every WordPress setting by key
    pub async fn save_integration_settings(&self, settings: &IntegrationSettings) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings.pairs() {
            sqlx::query(
                r#"
                INSERT INTO integration_settings (setting_key, setting_value, updated_at)
                VALUES (?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(setting_key) DO UPDATE SET
                    setting_value = excluded.setting_value,
                    updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // Product mirror

    /// Insert or overwrite the mirrored product with the same `woocommerce_id`.
    /// The row id, creation time and local product type are kept.
    pub async fn upsert_product(&self, product: &ProductRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO woocommerce_products (
                id, woocommerce_id, name, description, short_description, price,
                sale_price, regular_price, image_url, product_url, categories,
                status, in_stock, product_type, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(woocommerce_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                short_description = excluded.short_description,
                price = excluded.price,
                sale_price = excluded.sale_price,
                regular_price = excluded.regular_price,
                image_url = excluded.image_url,
                product_url = excluded.product_url,
                categories = excluded.categories,
                status = excluded.status,
                in_stock = excluded.in_stock,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(&product.id)
        .bind(product.woocommerce_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.regular_price)
        .bind(&product.image_url)
        .bind(&product.product_url)
        .bind(&product.categories)
        .bind(&product.status)
        .bind(product.in_stock)
        .bind(&product.product_type)
        .bind(&product.last_synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    const PRODUCT_COLUMNS: &'static str = "id, woocommerce_id, name, description, short_description, \
        price, sale_price, regular_price, image_url, product_url, categories, status, in_stock, \
        product_type, last_synced_at, created_at";

    /// Published products, newest first
    pub async fn list_published_products(&self) -> Result<Vec<ProductRow>> {
        let sql = format!(
            "SELECT {} FROM woocommerce_products WHERE status = 'publish' ORDER BY created_at DESC, rowid DESC",
            Self::PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn count_products(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM woocommerce_products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[cfg(test)]
    pub async fn get_product_by_woocommerce_id(&self, woocommerce_id: i64) -> Result<Option<ProductRow>> {
        let sql = format!(
            "SELECT {} FROM woocommerce_products WHERE woocommerce_id = ?",
            Self::PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(woocommerce_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }
}
