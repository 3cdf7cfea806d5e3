use base64::Engine;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::constants::*;
use crate::types::{PrismError, Result};

/// Base64 media blob inlined next to the prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePayload {
    pub mime_type: String,
    pub data: String,
}

impl InlinePayload {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Where the bytes behind a request come from.
#[derive(Debug)]
pub enum MediaSource {
    Upload { kind: MediaKind, file: UploadedFile },
    RemoteUrl(String),
    YouTube(String),
    /// Chat-style payload forwarded to the gateway untouched.
    TextOnly(serde_json::Value),
}

impl MediaSource {
    pub fn default_prompt(&self) -> Option<&'static str> {
        match self {
            MediaSource::Upload {
                kind: MediaKind::Video,
                ..
            } => Some(DEFAULT_VIDEO_PROMPT),
            MediaSource::Upload {
                kind: MediaKind::Audio,
                ..
            } => Some(DEFAULT_AUDIO_PROMPT),
            MediaSource::RemoteUrl(_) => Some(DEFAULT_VIDEO_URL_PROMPT),
            MediaSource::YouTube(_) => Some(DEFAULT_YOUTUBE_PROMPT),
            MediaSource::TextOnly(_) => None,
        }
    }

    /// Media routes get their text reshaped; raw passthrough does not.
    pub fn is_media(&self) -> bool {
        !matches!(self, MediaSource::TextOnly(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaSource::Upload {
                kind: MediaKind::Video,
                ..
            } => "video_upload",
            MediaSource::Upload {
                kind: MediaKind::Audio,
                ..
            } => "audio_upload",
            MediaSource::RemoteUrl(_) => "video_url",
            MediaSource::YouTube(_) => "youtube",
            MediaSource::TextOnly(_) => "text",
        }
    }
}

#[derive(Debug)]
pub struct MediaRequest {
    pub source: MediaSource,
    pub prompt: Option<String>,
}

impl MediaRequest {
    pub fn new(source: MediaSource, prompt: Option<String>) -> Self {
        // Blank prompts fall back to the route default, like a falsy string would.
        let prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Self { source, prompt }
    }

    pub fn effective_prompt(&self) -> &str {
        match (&self.prompt, self.source.default_prompt()) {
            (Some(p), _) => p,
            (None, Some(d)) => d,
            (None, None) => "",
        }
    }
}

#[derive(Debug)]
pub enum UploadedFile {
    Memory {
        file_name: String,
        mime_type: String,
        bytes: Bytes,
    },
    Staged(StagedUpload),
}

impl UploadedFile {
    pub fn file_name(&self) -> &str {
        match self {
            UploadedFile::Memory { file_name, .. } => file_name,
            UploadedFile::Staged(s) => &s.file_name,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            UploadedFile::Memory { bytes, .. } => bytes.len() as u64,
            UploadedFile::Staged(s) => s.size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn to_inline(&self) -> Result<InlinePayload> {
        match self {
            UploadedFile::Memory {
                mime_type, bytes, ..
            } => Ok(InlinePayload::from_bytes(mime_type.clone(), bytes)),
            UploadedFile::Staged(s) => s.read_inline().await,
        }
    }
}

/// Upload spooled to the scratch directory. The file is removed when this is dropped,
/// whether or not the read succeeded.
#[derive(Debug)]
pub struct StagedUpload {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    path: TempPath,
}

impl StagedUpload {
    pub async fn stage<S, E>(
        dir: &Path,
        file_name: &str,
        mime_type: &str,
        chunks: S,
    ) -> Result<Self>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<PrismError>,
    {
        let named = tempfile::Builder::new()
            .prefix(&format!("{}-", chrono::Utc::now().timestamp_millis()))
            .suffix(&format!("-{}", sanitize_file_name(file_name)))
            .tempfile_in(dir)?;
        let (std_file, path) = named.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        futures_util::pin_mut!(chunks);
        let mut size = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(Into::<PrismError>::into)?;
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!("Staged upload {} ({} bytes) at {:?}", file_name, size, &*path);

        Ok(Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_inline(&self) -> Result<InlinePayload> {
        let bytes = tokio::fs::read(&*self.path).await?;
        Ok(InlinePayload::from_bytes(self.mime_type.clone(), &bytes))
    }
}

/// Keeps only characters that are safe in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        crate::str_utils::prefix_chars(cleaned, 100).to_string()
    }
}

/// Downloads a remote video into an inline payload.
///
/// The content type is checked before the body is read, so a non-video URL
/// never costs a download. Bodies above `max_bytes` are rejected.
pub async fn fetch_remote_video(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<InlinePayload> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| PrismError::InvalidIngress(format!("Invalid video URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PrismError::InvalidIngress(format!(
            "Unsupported URL scheme: {}",
            parsed.scheme()
        ))
        .into());
    }

    let response = client.get(parsed).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => format!("Remote body unreadable: {}", e),
        };
        return Err(PrismError::Upstream(status, body).into());
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("video/") {
        tracing::warn!("Rejected remote media with content type {:?}", content_type);
        return Err(
            PrismError::UnsupportedMedia("URL does not point to a video file".to_string()).into(),
        );
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes as u64 {
            return Err(too_large(max_bytes).into());
        }
    }

    let mut buf = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(too_large(max_bytes).into());
        }
        buf.extend_from_slice(&chunk);
    }

    tracing::info!(
        "Fetched remote video: {} bytes, type {}",
        buf.len(),
        content_type
    );
    Ok(InlinePayload::from_bytes(content_type, &buf))
}

fn too_large(max_bytes: usize) -> PrismError {
    PrismError::PayloadTooLarge(format!(
        "Remote file exceeds the {} byte limit",
        max_bytes
    ))
}
