use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::constants::RESOLVER_TIER_HEADER;
use crate::health;
use crate::ingress::{read_upload_form, FormFields, UploadMode};
use crate::logging::request_id_middleware;
use crate::media::{MediaKind, MediaRequest, MediaSource};
use crate::pipeline::{analyze, Analysis};
use crate::redaction::redact_value;
use crate::types::{PrismError, Result};
use crate::youtube::extract_video_id;
use crate::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/test", get(health::liveness))
        .route("/api/health", get(health::api_health))
        .route("/test-gemini", get(health::test_gemini))
        .route("/process-video", post(process_video))
        .route("/process-video-url", post(process_video_url))
        .route("/process-audio", post(process_audio))
        .route("/process-youtube", post(process_youtube))
        .route("/gemini-text", post(gemini_text));

    if let Some(dir) = &state.args.static_dir {
        tracing::info!("Serving static files from {:?}", dir);
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(spa);
    }

    router
        .layer(DefaultBodyLimit::max(state.args.body_limit()))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn into_http(analysis: Analysis) -> Response {
    let mut response = (StatusCode::OK, Json(analysis.response.into_inner())).into_response();
    if let Some(tier) = analysis.tier {
        response
            .headers_mut()
            .insert(RESOLVER_TIER_HEADER, HeaderValue::from_static(tier.as_str()));
    }
    response
}

async fn run(state: &AppState, request: MediaRequest) -> Result<Response> {
    match analyze(state, request).await {
        Ok(analysis) => Ok(into_http(analysis)),
        Err(e) => {
            if e.inner.is_client_error() {
                tracing::warn!("Rejected request: {}", e.inner);
            } else {
                tracing::error!("Request failed: {}", e);
            }
            Err(e)
        }
    }
}

/// Non-multipart bodies get the same JSON error shape as every other bad input.
fn multipart_or_invalid(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Multipart> {
    multipart.map_err(|e| PrismError::InvalidIngress(e.body_text()).into())
}

/// POST /process-video (multipart `video`, optional `prompt`)
async fn process_video(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let multipart = multipart_or_invalid(multipart)?;
    let mode = UploadMode::Staged(state.args.uploads_dir.clone());
    let form = read_upload_form(multipart, "video", &mode).await?;
    let file = match form.file {
        Some(f) if !f.is_empty() => f,
        _ => return Err(PrismError::InvalidIngress("No video file provided".to_string()).into()),
    };
    let source = MediaSource::Upload {
        kind: MediaKind::Video,
        file,
    };
    run(&state, MediaRequest::new(source, form.prompt)).await
}

/// POST /process-audio (multipart `audio`, optional `prompt`)
async fn process_audio(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let multipart = multipart_or_invalid(multipart)?;
    let form = read_upload_form(multipart, "audio", &UploadMode::Memory).await?;
    let file = match form.file {
        Some(f) if !f.is_empty() => f,
        _ => return Err(PrismError::InvalidIngress("No audio file provided".to_string()).into()),
    };
    let source = MediaSource::Upload {
        kind: MediaKind::Audio,
        file,
    };
    run(&state, MediaRequest::new(source, form.prompt)).await
}

/// POST /process-video-url (`videoUrl`, optional `prompt`)
async fn process_video_url(State(state): State<Arc<AppState>>, fields: FormFields) -> Result<Response> {
    let url = fields
        .non_empty("videoUrl")
        .ok_or_else(|| PrismError::InvalidIngress("No video URL provided".to_string()))?;
    let request = MediaRequest::new(MediaSource::RemoteUrl(url), fields.non_empty("prompt"));
    run(&state, request).await
}

/// POST /process-youtube (`videoId` or a YouTube URL, optional `prompt`)
async fn process_youtube(State(state): State<Arc<AppState>>, fields: FormFields) -> Result<Response> {
    let raw = fields
        .non_empty("videoId")
        .ok_or_else(|| PrismError::InvalidIngress("No YouTube video ID provided".to_string()))?;
    let video_id = extract_video_id(&raw).ok_or_else(|| {
        PrismError::InvalidIngress(format!("Could not extract a YouTube video ID from {:?}", raw))
    })?;
    let request = MediaRequest::new(MediaSource::YouTube(video_id), fields.non_empty("prompt"));
    run(&state, request).await
}

/// POST /gemini-text: forwards a chat-style `{contents, ...}` body untouched.
async fn gemini_text(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Response> {
    let Json(body) = payload
        .map_err(|e| PrismError::InvalidIngress(format!("Invalid request format: {}", e.body_text())))?;
    if body.get("contents").map_or(true, Value::is_null) {
        return Err(PrismError::InvalidIngress("Invalid request format".to_string()).into());
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut logged = body.clone();
        redact_value(&mut logged);
        tracing::debug!("Request contents: {}", logged);
    }

    run(&state, MediaRequest::new(MediaSource::TextOnly(body), None)).await
}
