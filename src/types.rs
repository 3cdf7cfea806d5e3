use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value};
use thiserror::Error;
use tracing_error::SpanTrace;

use crate::constants::{OVERLOADED_ERROR, OVERLOADED_MESSAGE, QUOTA_ERROR, QUOTA_MESSAGE};

#[derive(Error, Debug)]
pub enum PrismError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Invalid ingress payload: {0}")]
    InvalidIngress(String),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream overloaded: {0}")]
    Overloaded(String),

    #[error("Upstream quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Upstream error (status {0}): {1}")]
    Upstream(StatusCode, String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String, SpanTrace),
}

#[derive(Debug)]
pub struct ObservedError {
    pub inner: PrismError,
    pub span_trace: SpanTrace,
}

impl std::fmt::Display for ObservedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\nSpan Trace:\n{}", self.inner, self.span_trace)
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E> From<E> for ObservedError
where
    E: Into<PrismError>,
{
    fn from(error: E) -> Self {
        Self {
            inner: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;

/// Upstream bodies are echoed back as JSON when they parse, raw text otherwise.
pub fn body_as_json(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => v,
        Err(_) => Value::String(body.to_string()),
    }
}

impl IntoResponse for ObservedError {
    fn into_response(self) -> axum::response::Response {
        // Classified upstream failures keep the shape browser clients already parse.
        let (status, mut body) = match &self.inner {
            PrismError::Overloaded(original) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": OVERLOADED_ERROR,
                    "message": OVERLOADED_MESSAGE,
                    "code": "UPSTREAM_OVERLOADED",
                    "originalError": body_as_json(original),
                }),
            ),
            PrismError::QuotaExceeded(original) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": QUOTA_ERROR,
                    "message": QUOTA_MESSAGE,
                    "code": "UPSTREAM_QUOTA",
                    "originalError": body_as_json(original),
                }),
            ),
            PrismError::Upstream(upstream_status, original) => (
                // Upstream 4xx/5xx statuses are passed through; anything else is a 500.
                if upstream_status.is_client_error() || upstream_status.is_server_error() {
                    *upstream_status
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
                json!({
                    "error": body_as_json(original),
                    "code": "UPSTREAM_ERROR",
                    "upstreamStatus": upstream_status.as_u16(),
                }),
            ),
            PrismError::InvalidIngress(m) => error_body(StatusCode::BAD_REQUEST, m, "INVALID_INGRESS"),
            PrismError::UnsupportedMedia(m) => {
                error_body(StatusCode::BAD_REQUEST, m, "UNSUPPORTED_MEDIA")
            }
            PrismError::PayloadTooLarge(m) => {
                error_body(StatusCode::BAD_REQUEST, m, "PAYLOAD_TOO_LARGE")
            }
            PrismError::Multipart(e) => error_body(e.status(), &e.body_text(), "MULTIPART_ERROR"),
            PrismError::Network(e) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
                "NETWORK_ERROR",
            ),
            PrismError::Serialization(e) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
                "SERIALIZATION_ERROR",
            ),
            PrismError::Io(e) => {
                error_body(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), "IO_ERROR")
            }
            PrismError::Config(m) => error_body(StatusCode::INTERNAL_SERVER_ERROR, m, "CONFIG_ERROR"),
            PrismError::Internal(m, _) => {
                error_body(StatusCode::INTERNAL_SERVER_ERROR, m, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() && !self.inner.is_upstream() {
            body["span_trace"] = json!(self.span_trace.to_string());
        }
        (status, axum::Json(body)).into_response()
    }
}

fn error_body(status: StatusCode, msg: &str, code: &str) -> (StatusCode, Value) {
    (status, json!({ "error": msg, "code": code }))
}

impl PrismError {
    /// True for failures the caller caused; used to pick the log level.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PrismError::InvalidIngress(_)
                | PrismError::UnsupportedMedia(_)
                | PrismError::PayloadTooLarge(_)
                | PrismError::Multipart(_)
        )
    }

    /// True for failures reported by the generative-content API itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PrismError::Overloaded(_) | PrismError::QuotaExceeded(_) | PrismError::Upstream(..)
        )
    }
}
