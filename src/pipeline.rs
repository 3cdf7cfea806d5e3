use crate::gateway::GatewayResponse;
use crate::logging::log_response_summary;
use crate::media::{fetch_remote_video, MediaRequest, MediaSource};
use crate::reshape::reshape_response;
use crate::str_utils::prefix_chars;
use crate::types::Result;
use crate::youtube::ResolverTier;
use crate::AppState;

pub struct Analysis {
    pub response: GatewayResponse,
    /// Set for YouTube requests.
    pub tier: Option<ResolverTier>,
}

/// Normalizes the request's media, makes the gateway call, and reshapes the text.
#[tracing::instrument(
    name = "prism.analyze",
    skip_all,
    fields(source = request.source.label())
)]
pub async fn analyze(state: &AppState, request: MediaRequest) -> Result<Analysis> {
    let prompt = request.effective_prompt().to_string();
    if request.source.is_media() {
        tracing::info!("Using prompt: {}", prefix_chars(&prompt, 120));
    }
    let reshape = state.args.reshape_enabled() && request.source.is_media();

    let (mut response, tier) = match request.source {
        MediaSource::Upload { kind, file } => {
            tracing::info!(
                "Processing {:?} upload: {}, size: {} bytes",
                kind,
                file.file_name(),
                file.len()
            );
            let inline = file.to_inline().await?;
            // Removes the staged copy, if any. The error path above drops it too.
            drop(file);
            (state.gateway.generate_parts(&prompt, Some(inline)).await?, None)
        }
        MediaSource::RemoteUrl(url) => {
            tracing::info!("Processing video URL: {}", url);
            let inline =
                fetch_remote_video(&state.client, &url, state.args.max_remote_bytes).await?;
            (state.gateway.generate_parts(&prompt, Some(inline)).await?, None)
        }
        MediaSource::YouTube(video_id) => {
            tracing::info!("Processing YouTube video ID: {}", video_id);
            let resolved = state.resolver.resolve(&video_id, &prompt).await;
            let response = state
                .gateway
                .generate_parts(&resolved.text, resolved.thumbnail)
                .await?;
            (response, Some(resolved.tier))
        }
        MediaSource::TextOnly(body) => (state.gateway.generate(&body).await?, None),
    };

    if reshape {
        reshape_response(&mut response);
    }
    log_response_summary(&response);

    Ok(Analysis { response, tier })
}
