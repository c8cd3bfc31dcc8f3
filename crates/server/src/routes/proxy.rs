//! AI-coach chat proxy
//!
//! Forwards the chat payload to the workflow webhook and always answers with
//! a body the chat screen can render.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::{config::CoachConfig, state::AppState};

pub const SERVICE_UNAVAILABLE: &str =
    "متأسفم، در حال حاضر سرویس در دسترس نیست. لطفاً بعداً دوباره تلاش کنید.";
pub const PROCESSING_ERROR: &str =
    "متأسفم، خطایی در پردازش درخواست رخ داد. لطفاً دوباره تلاش کنید.";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("webhook unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Upstream(u16),
}

/// `[{"output": text}]`, the shape every caller understands
pub fn output_body(text: &str) -> Value {
    json!([{ "output": text }])
}

/// Send `payload` to the webhook. A 2xx reply comes back with its status and
/// its JSON body, or the raw text wrapped as `[{"output": ...}]`.
pub async fn forward(
    http: &reqwest::Client,
    coach: &CoachConfig,
    payload: &Value,
) -> Result<(StatusCode, Value), ProxyError> {
    let response = http
        .put(&coach.webhook_url)
        .json(payload)
        .timeout(Duration::from_secs(coach.timeout_secs))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(
            "Webhook HTTP error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        return Err(ProxyError::Upstream(status.as_u16()));
    }

    let text = response.text().await?;
    tracing::debug!("Raw webhook response: {}", text);

    let body = match serde_json::from_str::<Value>(&text) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Webhook reply is not JSON ({}), wrapping as text", e);
            output_body(&text)
        }
    };

    let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK);
    Ok((status, body))
}

/// POST /functions/ai-coach-proxy
pub async fn ai_coach_proxy(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Unreadable chat proxy request: {}", e);
            return (StatusCode::OK, Json(output_body(PROCESSING_ERROR)));
        }
    };

    tracing::info!("Forwarding chat message to webhook: {}", payload);

    match forward(&state.http, &state.config.coach, &payload).await {
        Ok((status, reply)) => (status, Json(reply)),
        Err(e) => {
            tracing::error!("Chat proxy falling back: {}", e);
            (StatusCode::OK, Json(output_body(SERVICE_UNAVAILABLE)))
        }
    }
}
