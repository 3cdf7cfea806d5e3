use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /test
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        message: "Server is running",
    })
}

/// GET /api/health
pub async fn api_health() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        message: "Prism server is running",
    })
}

#[derive(Serialize)]
pub struct SmokeTestResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /test-gemini: one round trip through the gateway with a fixed prompt.
pub async fn test_gemini(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SmokeTestResponse>) {
    tracing::info!("Testing Gemini API connection ({})", state.gateway.model());

    match state.gateway.smoke_test().await {
        Ok(response) => {
            tracing::info!(
                "Gemini API test successful: {}",
                crate::str_utils::prefix_chars(response.text_or_unexpected(), 80)
            );
            (
                StatusCode::OK,
                Json(SmokeTestResponse {
                    status: "success",
                    message: "Gemini API is working correctly".to_string(),
                    response: Some(response.into_inner()),
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Gemini API test failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SmokeTestResponse {
                    status: "error",
                    message: "Gemini API test failed".to_string(),
                    response: None,
                    error: Some(e.inner.to_string()),
                }),
            )
        }
    }
}
