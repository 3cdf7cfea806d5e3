use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::*;
use crate::error_rules::ErrorRules;
use crate::gateway::GeminiGateway;
use crate::types::{PrismError, Result};
use crate::youtube::{VideoInfoProvider, YouTubeClient, YouTubeResolver};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, env = "PORT", default_value_t = 3030)]
    pub port: u16,
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// How many consecutive ports to try when the first one is taken
    #[arg(long, default_value_t = 10)]
    pub port_attempts: u16,
    #[arg(long, env = "GEMINI_MODEL", default_value = GEMINI_DEFAULT_MODEL)]
    pub model: String,
    #[arg(long, env = "GEMINI_API_BASE", default_value = GEMINI_API_BASE_URL)]
    pub api_base_url: String,
    #[arg(long, default_value = YOUTUBE_BASE_URL)]
    pub youtube_base_url: String,
    #[arg(long, default_value = "uploads")]
    pub uploads_dir: PathBuf,
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,
    /// Serve a built front-end from this directory for unmatched GET requests
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_REMOTE_BYTES)]
    pub max_remote_bytes: usize,
    #[arg(long, default_value_t = 300)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
    /// Return model text exactly as received
    #[arg(long, default_value_t = false)]
    pub no_reshape: bool,
    /// JSON file overriding the upstream error classification rules
    #[arg(long)]
    pub error_rules: Option<PathBuf>,
}

impl Args {
    pub fn reshape_enabled(&self) -> bool {
        !self.no_reshape
    }

    /// Total request body limit: the per-file cap plus room for the text fields.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes.saturating_add(FORM_FIELD_HEADROOM_BYTES)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub gateway: Arc<GeminiGateway>,
    pub resolver: Arc<YouTubeResolver>,
    pub args: Arc<Args>,
}

impl AppState {
    pub fn new(
        args: Arc<Args>,
        client: reqwest::Client,
        api_key: String,
        rules: ErrorRules,
    ) -> Self {
        let provider: Arc<dyn VideoInfoProvider> =
            Arc::new(YouTubeClient::new(client.clone(), args.youtube_base_url.clone()));
        Self::with_provider(args, client, api_key, rules, provider)
    }

    /// Same as [`AppState::new`] with a caller-supplied metadata provider.
    pub fn with_provider(
        args: Arc<Args>,
        client: reqwest::Client,
        api_key: String,
        rules: ErrorRules,
        provider: Arc<dyn VideoInfoProvider>,
    ) -> Self {
        let gateway = GeminiGateway::new(
            client.clone(),
            args.api_base_url.clone(),
            args.model.clone(),
            api_key,
            Arc::new(rules),
        );
        Self {
            client,
            gateway: Arc::new(gateway),
            resolver: Arc::new(YouTubeResolver::new(provider)),
            args,
        }
    }
}

pub fn build_http_client(args: &Args) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_secs))
        .connect_timeout(Duration::from_secs(args.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()
        .map_err(|e| PrismError::Config(format!("failed to build HTTP client: {}", e)).into())
}

/// First non-empty key among the supported environment variables.
pub fn api_key_from_env() -> Option<String> {
    GEMINI_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|k| !k.trim().is_empty())
}

pub fn load_error_rules(args: &Args) -> Result<ErrorRules> {
    match &args.error_rules {
        Some(path) => ErrorRules::load(path),
        None => Ok(ErrorRules::default()),
    }
}
