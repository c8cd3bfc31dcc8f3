use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    match state.db.count_products().await {
        Ok(products) => Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "mirrored_products": products,
        })),
        Err(e) => {
            tracing::error!("Health check database probe failed: {}", e);
            Json(json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::db::tests::product_row;
    use crate::routes::testing::{json_request, send, test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_health_reports_mirror_size() {
        let (app, state) = test_app().await;
        state.db.upsert_product(&product_row(1, "a")).await.unwrap();

        let (status, body) = send(&app, json_request("GET", "/health", None, json!(null))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mirrored_products"], 1);
    }
}
