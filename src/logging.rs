use axum::{
    body::Body,
    http::{HeaderValue, Request, Response},
    middleware::Next,
};
use std::panic;
use std::path::Path;
use tracing::{error, info, info_span, Instrument};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use crate::constants::REQUEST_ID_HEADER;
use crate::gateway::GatewayResponse;
use crate::redaction::RedactingWriter;

pub const DEFAULT_LOG_FILTER: &str = "prism=debug,tower_http=info";
pub const LOG_FILE_NAME: &str = "prism.log";

/// Installs the global subscriber: stdout, a daily-rolled file, and span traces for errors.
/// Keep the returned guard alive for the life of the process or buffered lines are lost.
pub fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => DEFAULT_LOG_FILTER.into(),
    };

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(|| RedactingWriter::new(std::io::stdout())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(move || RedactingWriter::new(non_blocking.clone()))
                .with_ansi(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    guard
}

/// Sets up a global panic hook that logs panics through tracing before the default hook runs.
pub fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();

        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            target: "panic",
            message = %message,
            location = %location,
            backtrace = %backtrace,
            "FATAL: Application panicked"
        );

        original_hook(panic_info);
    }));
}

/// Tags every request with a UUID, both as a span field and a response header.
pub async fn request_id_middleware(req: Request<Body>, next: Next) -> Response<Body> {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let started = std::time::Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            "[RES] Status: {} | {}ms",
            response.status().as_u16(),
            started.elapsed().as_millis()
        );
    });

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}

pub fn log_response_summary(response: &GatewayResponse) {
    let content_status = match response.text() {
        None => "MALFORMED".to_string(),
        Some("") => "EMPTY".to_string(),
        Some(s) => format!("TEXT[{}]", s.chars().count()),
    };
    let finish_reason = response
        .0
        .pointer("/candidates/0/finishReason")
        .and_then(|v| v.as_str())
        .unwrap_or("UNKNOWN");

    if response.text().is_none() {
        tracing::warn!(
            target: "flight_recorder",
            "[RES] {}: {}",
            crate::constants::UNEXPECTED_RESPONSE_FORMAT,
            crate::str_utils::prefix_chars(&response.0.to_string(), 200)
        );
    }

    info!(
        target: "flight_recorder",
        "[RES] Candidates: {} | Finish: {} | Content: {}",
        response.candidate_count(),
        finish_reason,
        content_status
    );
}
