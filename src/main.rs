use clap::Parser;
use prism::main_helper::{api_key_from_env, build_http_client, load_error_rules};
use prism::routes::build_router;
use prism::server::bind_with_fallback;
use prism::*;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Arc::new(Args::parse());

    let _guard = prism::logging::init_tracing(&args.log_dir);
    prism::logging::setup_panic_hook();

    if let Err(e) = tokio::fs::create_dir_all(&args.uploads_dir).await {
        eprintln!(
            "Failed to create uploads directory {:?}: {}",
            args.uploads_dir, e
        );
        std::process::exit(1);
    }

    let api_key = match api_key_from_env() {
        Some(k) => k,
        None => {
            eprintln!("Error: GEMINI_API_KEY environment variable is missing or empty.");
            eprintln!("Please set it in your .env file or environment.");
            std::process::exit(1);
        }
    };

    let rules = match load_error_rules(&args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load error rules: {}", e.inner);
            std::process::exit(1);
        }
    };

    let client = match build_http_client(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.inner);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(args.clone(), client, api_key, rules));
    tracing::info!(
        "Gateway model: {} | reshape: {}",
        state.gateway.model(),
        args.reshape_enabled()
    );
    let app = build_router(state);

    let listener = match bind_with_fallback(&args.host, args.port, args.port_attempts).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Could not bind a port starting at {}: {}", args.port, e);
            eprintln!("Could not bind a port starting at {}: {}", args.port, e);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(addr) => tracing::info!("Prism listening on http://{}", addr),
        Err(e) => tracing::warn!("Listening, but local address is unavailable: {}", e),
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
