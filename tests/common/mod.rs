#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::{Query, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use futures_util::future::BoxFuture;
use prism::error_rules::ErrorRules;
use prism::media::InlinePayload;
use prism::youtube::{VideoInfoProvider, VideoMetadata};
use prism::{AppState, Args, PrismError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

struct FakeGeminiState {
    status: StatusCode,
    body: Value,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<Value>>>,
    last_key: Arc<Mutex<Option<String>>>,
}

/// Stand-in for the generateContent endpoint. Every POST gets the same canned reply.
pub struct FakeGemini {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<Value>>>,
    last_key: Arc<Mutex<Option<String>>>,
}

impl FakeGemini {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));
        let last_key = Arc::new(Mutex::new(None));
        let state = Arc::new(FakeGeminiState {
            status,
            body,
            hits: hits.clone(),
            last_request: last_request.clone(),
            last_key: last_key.clone(),
        });
        let app = Router::new().fallback(fake_generate).with_state(state);
        Self {
            base_url: serve(app).await,
            hits,
            last_request,
            last_key,
        }
    }

    pub async fn replying(text: &str) -> Self {
        Self::start(StatusCode::OK, text_response(text)).await
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Value {
        self.last_request.lock().unwrap().clone().unwrap_or(Value::Null)
    }

    pub fn last_key(&self) -> Option<String> {
        self.last_key.lock().unwrap().clone()
    }
}

async fn fake_generate(
    State(state): State<Arc<FakeGeminiState>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_request.lock().unwrap() = Some(body);
    *state.last_key.lock().unwrap() = query.get("key").cloned();
    (state.status, Json(state.body.clone())).into_response()
}

/// Serves `/clip.mp4` as video and `/page.html` as HTML.
pub async fn start_media_host() -> String {
    let app = Router::new()
        .route(
            "/clip.mp4",
            get(|| async { ([(header::CONTENT_TYPE, "video/mp4")], vec![0u8, 1, 2, 3, 4, 5]) }),
        )
        .route(
            "/page.html",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
        );
    serve(app).await
}

/// Provider double with canned answers for each tier.
#[derive(Default)]
pub struct FakeProvider {
    pub metadata: Option<VideoMetadata>,
    pub watch_page: Option<String>,
    pub thumbnail_ok: bool,
    pub info_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl VideoInfoProvider for FakeProvider {
    fn video_info<'a>(&'a self, _video_id: &'a str) -> BoxFuture<'a, prism::Result<VideoMetadata>> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.metadata {
            Some(m) => Ok(m.clone()),
            None => Err(PrismError::Internal(
                "player response missing".to_string(),
                tracing_error::SpanTrace::capture(),
            )
            .into()),
        };
        Box::pin(async move { result })
    }

    fn watch_page<'a>(&'a self, _video_id: &'a str) -> BoxFuture<'a, prism::Result<String>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.watch_page {
            Some(html) => Ok(html.clone()),
            None => Err(PrismError::Upstream(StatusCode::FORBIDDEN, "blocked".to_string()).into()),
        };
        Box::pin(async move { result })
    }

    fn thumbnail<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, prism::Result<InlinePayload>> {
        let result = if self.thumbnail_ok {
            Ok(InlinePayload::from_bytes("image/jpeg", b"jpeg"))
        } else {
            Err(PrismError::Upstream(StatusCode::NOT_FOUND, "no thumbnail".to_string()).into())
        };
        Box::pin(async move { result })
    }
}

pub fn sample_metadata() -> VideoMetadata {
    VideoMetadata {
        title: "Never Gonna Give You Up".to_string(),
        channel: "Rick Astley".to_string(),
        duration: "213 seconds".to_string(),
        keywords: vec!["rick".to_string(), "astley".to_string()],
        thumbnail_url: Some("https://i.ytimg.com/vi/x/hqdefault.jpg".to_string()),
        ..Default::default()
    }
}

pub fn test_args(gemini_base: &str, uploads_dir: &Path, extra: &[&str]) -> Args {
    let mut argv = vec![
        "prism".to_string(),
        "--api-base-url".to_string(),
        gemini_base.to_string(),
        "--model".to_string(),
        "test-model".to_string(),
        "--uploads-dir".to_string(),
        uploads_dir.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    Args::parse_from(argv)
}

pub fn test_state(args: Args, provider: Arc<dyn VideoInfoProvider>) -> Arc<AppState> {
    Arc::new(AppState::with_provider(
        Arc::new(args),
        reqwest::Client::new(),
        "test-key".to_string(),
        ErrorRules::default(),
        provider,
    ))
}

pub fn test_router(gemini: &FakeGemini, uploads_dir: &Path, extra: &[&str]) -> Router {
    let args = test_args(&gemini.base_url, uploads_dir, extra);
    prism::routes::build_router(test_state(args, Arc::new(FakeProvider::default())))
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HashMap<String, String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, body)
}

pub fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        mime: &'a str,
        bytes: &'a [u8],
    },
}

pub const BOUNDARY: &str = "prism-test-boundary";

pub fn multipart_post(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, mime
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
