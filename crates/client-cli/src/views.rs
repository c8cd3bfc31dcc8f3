//! Plain-text renderings of server data

use serde_json::Value;
use shared::{
    persian::{format_number, to_persian_digits},
    AdminStats, ChatHistoryEntry, IntegrationSettings, Product, ProductCard, UserWithRole,
};

const EMPTY_CATALOG: &str = "محصولی یافت نشد";
const EMPTY_HISTORY: &str = "هنوز گفتگویی ثبت نشده است";

pub fn stats(stats: &AdminStats) -> String {
    let rows = [
        ("کل کاربران", stats.total_users),
        ("کل پیام‌ها", stats.total_messages),
        ("پیام‌های امروز", stats.today_messages),
        ("کاربران هفته اخیر", stats.weekly_users),
    ];
    rows.iter()
        .map(|(label, value)| format!("{}: {}", label, format_number(*value as f64)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Left-aligned table with a header row
fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.iter().map(|h| h.to_string()).collect())];
    out.extend(rows.into_iter().map(line));
    out.join("\n")
}

pub fn users(users: &[UserWithRole]) -> String {
    let rows = users
        .iter()
        .map(|u| {
            vec![
                u.id.clone(),
                u.email.clone(),
                u.full_name.clone().unwrap_or_else(|| "-".to_string()),
                u.role.label().to_string(),
                u.created_at.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(&["ID", "EMAIL", "NAME", "ROLE", "CREATED"], rows)
}

pub fn history(entries: &[ChatHistoryEntry]) -> String {
    if entries.is_empty() {
        return EMPTY_HISTORY.to_string();
    }
    entries
        .iter()
        .map(|e| {
            let mut block = format!(
                "[{}] {}\n  > {}",
                e.created_at.as_deref().unwrap_or("-"),
                e.user_name,
                e.message
            );
            if let Some(response) = &e.response {
                block.push_str(&format!("\n  < {}", response));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn products(products: &[&Product], compact: bool) -> String {
    if products.is_empty() {
        return EMPTY_CATALOG.to_string();
    }
    let separator = if compact { "\n" } else { "\n\n" };
    products
        .iter()
        .map(|p| {
            let card = ProductCard::from(*p);
            if compact {
                card.render_compact()
            } else {
                card.render()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => "(not set)".to_string(),
        n if n <= 4 => "****".to_string(),
        _ => {
            let tail: String = secret.chars().skip(secret.chars().count() - 4).collect();
            format!("****{}", tail)
        }
    }
}

pub fn settings(settings: &IntegrationSettings) -> String {
    let url = if settings.wordpress_url.is_empty() {
        "(not set)"
    } else {
        &settings.wordpress_url
    };
    format!(
        "wordpress_url: {}\nwordpress_api_key: {}\nwordpress_api_secret: {}",
        url,
        mask(&settings.wordpress_api_key),
        mask(&settings.wordpress_api_secret)
    )
}

/// Summary line for a sync action's reply, followed by the full body
pub fn sync_result(status: u16, body: &Value) -> String {
    let headline = if let Some(message) = body.get("message").and_then(Value::as_str) {
        message.to_string()
    } else if let Some(error) = body.get("error").and_then(Value::as_str) {
        format!("{} (HTTP {})", error, status)
    } else {
        format!("HTTP {}", status)
    };
    let details = serde_json::to_string_pretty(body).unwrap_or_default();
    format!("{}\n{}", headline, details)
}

/// "۳ پیام" style counter
pub fn count(n: usize, noun: &str) -> String {
    format!("{} {}", to_persian_digits(&n.to_string()), noun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::Role;

    fn product(name: &str, price: f64) -> Product {
        Product {
            id: "p".to_string(),
            woocommerce_id: 1,
            name: name.to_string(),
            description: None,
            short_description: None,
            price,
            sale_price: None,
            regular_price: price,
            image_url: None,
            product_url: Some("https://shop.example/p/1".to_string()),
            categories: vec![],
            status: "publish".to_string(),
            in_stock: true,
            product_type: None,
        }
    }

    #[test]
    fn test_stats_use_persian_digits() {
        let text = stats(&AdminStats {
            total_users: 1200,
            total_messages: 5,
            today_messages: 0,
            weekly_users: 3,
        });
        assert!(text.starts_with("کل کاربران: ۱٬۲۰۰"));
        assert!(text.contains("پیام‌های امروز: ۰"));
    }

    #[test]
    fn test_users_table_aligns_columns() {
        let text = users(&[UserWithRole {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            full_name: None,
            avatar_url: None,
            created_at: Some("2024-01-01".to_string()),
            role: Role::Admin,
        }]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID  EMAIL"));
        assert!(lines[1].contains("مدیر"));
        assert!(lines[1].contains(" -  "));
    }

    #[test]
    fn test_history_blocks() {
        assert_eq!(history(&[]), EMPTY_HISTORY);
        let text = history(&[ChatHistoryEntry {
            id: "m1".to_string(),
            user_id: "u1".to_string(),
            user_name: "سارا".to_string(),
            message: "سلام".to_string(),
            response: Some("درود".to_string()),
            session_id: None,
            created_at: None,
        }]);
        assert_eq!(text, "[-] سارا\n  > سلام\n  < درود");
    }

    #[test]
    fn test_products_compact_and_empty() {
        assert_eq!(products(&[], false), EMPTY_CATALOG);
        let a = product("الف", 0.0);
        let b = product("ب", 1000.0);
        let text = products(&[&a, &b], true);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("رایگان"));
    }

    #[test]
    fn test_settings_masks_credentials() {
        let text = settings(&IntegrationSettings {
            wordpress_url: "https://shop.example".to_string(),
            wordpress_api_key: "ck_123456".to_string(),
            wordpress_api_secret: String::new(),
        });
        assert!(text.contains("wordpress_api_key: ****3456"));
        assert!(text.contains("wordpress_api_secret: (not set)"));
        assert!(!text.contains("ck_123456"));
    }

    #[test]
    fn test_sync_result_headline() {
        let ok = sync_result(200, &json!({ "message": "Connection successful" }));
        assert!(ok.starts_with("Connection successful\n"));
        let err = sync_result(400, &json!({ "error": "Invalid action" }));
        assert!(err.starts_with("Invalid action (HTTP 400)"));
    }

    #[test]
    fn test_count() {
        assert_eq!(count(12, "پیام"), "۱۲ پیام");
    }
}
