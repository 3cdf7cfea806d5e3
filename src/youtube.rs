//! YouTube metadata resolution.
//!
//! Resolution walks an ordered list of tiers and stops at the first that
//! succeeds. Each tier yields its own prompt; the last tier needs nothing but
//! the video id and cannot fail, so a caller always ends up with something to
//! send to the gateway.

use futures_util::future::BoxFuture;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use crate::constants::*;
use crate::media::InlinePayload;
use crate::types::{PrismError, Result};

lazy_static! {
    static ref TITLE_REGEX: Regex =
        Regex::new(r"<title>([^<]*)</title>").expect("Invalid title regex");
    static ref BARE_ID_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid video id regex");
    static ref URL_ID_REGEXES: Vec<Regex> = [
        r"(?:youtube\.com/watch\?(?:[^#\s]*&)?v=|youtu\.be/)([^&?#/\s]+)",
        r"youtube\.com/embed/([^&?#/\s]+)",
        r"youtube\.com/v/([^&?#/\s]+)",
        r"youtube\.com/shorts/([^&?#/\s]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid YouTube URL regex"))
    .collect();
}

/// Accepts a bare 11-character id or any common YouTube URL form.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if BARE_ID_REGEX.is_match(input) {
        return Some(input.to_string());
    }
    URL_ID_REGEXES
        .iter()
        .find_map(|re| re.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| BARE_ID_REGEX.is_match(id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub channel: String,
    pub publish_date: String,
    pub view_count: String,
    pub like_count: String,
    pub duration: String,
    pub keywords: Vec<String>,
    pub category: String,
    pub is_live: bool,
    pub thumbnail_url: Option<String>,
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            description: NO_DESCRIPTION.to_string(),
            channel: UNKNOWN_CHANNEL.to_string(),
            publish_date: UNKNOWN_DATE.to_string(),
            view_count: UNKNOWN_COUNT.to_string(),
            like_count: UNKNOWN_COUNT.to_string(),
            duration: UNKNOWN_DURATION.to_string(),
            keywords: Vec::new(),
            category: UNKNOWN_CATEGORY.to_string(),
            is_live: false,
            thumbnail_url: None,
        }
    }
}

fn str_field(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl VideoMetadata {
    /// Reads the embedded player response. Only a missing `videoDetails` object is
    /// fatal; every other field falls back to its own placeholder.
    pub fn from_player_response(player: &Value) -> Option<Self> {
        let details = player.get("videoDetails")?.as_object()?;
        let micro = player.pointer("/microformat/playerMicroformatRenderer");
        let defaults = Self::default();

        let keywords = match details.get("keywords").and_then(|k| k.as_array()) {
            Some(list) => list
                .iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
            None => Vec::new(),
        };

        Some(Self {
            title: str_field(details.get("title")).unwrap_or(defaults.title),
            description: str_field(details.get("shortDescription"))
                .unwrap_or(defaults.description),
            channel: str_field(details.get("author")).unwrap_or(defaults.channel),
            publish_date: str_field(micro.and_then(|m| m.get("publishDate")))
                .unwrap_or(defaults.publish_date),
            view_count: str_field(details.get("viewCount")).unwrap_or(defaults.view_count),
            like_count: str_field(micro.and_then(|m| m.get("likeCount")))
                .unwrap_or(defaults.like_count),
            duration: match str_field(details.get("lengthSeconds")) {
                Some(secs) => format!("{} seconds", secs),
                None => defaults.duration,
            },
            keywords,
            category: str_field(micro.and_then(|m| m.get("category")))
                .unwrap_or(defaults.category),
            is_live: details
                .get("isLiveContent")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            thumbnail_url: str_field(details.get("thumbnail").and_then(|t| t.pointer("/thumbnails/0/url"))),
        })
    }

    pub fn keywords_display(&self) -> String {
        if self.keywords.is_empty() {
            NO_KEYWORDS.to_string()
        } else {
            self.keywords.join(", ")
        }
    }
}

/// Finds `ytInitialPlayerResponse = {...}` in a watch page and parses the object.
pub fn extract_player_response(html: &str) -> Option<Value> {
    let marker = html.find(PLAYER_RESPONSE_MARKER)?;
    let after = &html[marker + PLAYER_RESPONSE_MARKER.len()..];
    let brace = after.find('{')?;
    // Only whitespace and `=` may sit between the marker and the object.
    if !after[..brace].chars().all(|c| c.is_whitespace() || c == '=') {
        return None;
    }
    // The streaming deserializer stops after the first complete value.
    serde_json::Deserializer::from_str(&after[brace..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Pulls the page `<title>` and drops the trailing " - YouTube".
pub fn extract_page_title(html: &str) -> Option<String> {
    let raw = TITLE_REGEX.captures(html)?.get(1)?.as_str().trim_end();
    let title = raw.strip_suffix(YOUTUBE_TITLE_SUFFIX).unwrap_or(raw).trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// The I/O the resolver needs. The HTTP implementation is [`YouTubeClient`].
pub trait VideoInfoProvider: Send + Sync {
    /// Structured video details.
    fn video_info<'a>(&'a self, video_id: &'a str) -> BoxFuture<'a, Result<VideoMetadata>>;

    /// Raw watch-page HTML.
    fn watch_page<'a>(&'a self, video_id: &'a str) -> BoxFuture<'a, Result<String>>;

    fn thumbnail<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<InlinePayload>>;
}

pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch_watch_page(&self, video_id: &str) -> Result<String> {
        let url = format!("{}/watch", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("v", video_id)])
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .header(reqwest::header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrismError::Upstream(status, "watch page request failed".to_string()).into());
        }
        Ok(response.text().await?)
    }

    async fn fetch_video_info(&self, video_id: &str) -> Result<VideoMetadata> {
        let html = self.fetch_watch_page(video_id).await?;
        let player = extract_player_response(&html).ok_or_else(|| {
            PrismError::Internal(
                "watch page has no embedded player response".to_string(),
                tracing_error::SpanTrace::capture(),
            )
        })?;
        VideoMetadata::from_player_response(&player).ok_or_else(|| {
            PrismError::Internal(
                "player response has no videoDetails".to_string(),
                tracing_error::SpanTrace::capture(),
            )
            .into()
        })
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<InlinePayload> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?
            .error_for_status()?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or(DEFAULT_THUMBNAIL_MIME)
            .to_string();
        let bytes = response.bytes().await?;
        Ok(InlinePayload::from_bytes(mime_type, &bytes))
    }
}

impl VideoInfoProvider for YouTubeClient {
    fn video_info<'a>(&'a self, video_id: &'a str) -> BoxFuture<'a, Result<VideoMetadata>> {
        Box::pin(self.fetch_video_info(video_id))
    }

    fn watch_page<'a>(&'a self, video_id: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.fetch_watch_page(video_id))
    }

    fn thumbnail<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<InlinePayload>> {
        Box::pin(self.fetch_thumbnail(url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverTier {
    Structured,
    WatchPage,
    IdOnly,
}

impl ResolverTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverTier::Structured => "structured",
            ResolverTier::WatchPage => "watch_page",
            ResolverTier::IdOnly => "id_only",
        }
    }
}

/// What the resolver hands to the gateway.
#[derive(Debug, Clone)]
pub struct ResolvedPrompt {
    pub tier: ResolverTier,
    pub text: String,
    /// Only the structured tier attaches an image.
    pub thumbnail: Option<InlinePayload>,
}

pub fn structured_prompt(prompt: &str, meta: &VideoMetadata) -> String {
    format!(
        "{prompt}\n\nVideo Title: {}\nDescription: {}\nChannel: {}\nPublished: {}\nCategory: {}\nKeywords: {}\nDuration: {}\nViews: {}\nLikes: {}\nIs Live Content: {}\n\nPlease provide a detailed analysis of this YouTube video based on the metadata above. Consider the title, description, channel, category, and other details to infer what the video might be about. If possible, analyze the tone, target audience, and potential content of the video.",
        meta.title,
        meta.description,
        meta.channel,
        meta.publish_date,
        meta.category,
        meta.keywords_display(),
        meta.duration,
        meta.view_count,
        meta.like_count,
        if meta.is_live { "Yes" } else { "No" },
    )
}

pub fn watch_page_prompt(prompt: &str, video_id: &str, title: &str) -> String {
    format!(
        "{prompt}\n\nYouTube Video ID: {video_id}\nVideo Title: {title}\nURL: {YOUTUBE_WATCH_URL}{video_id}\n\nPlease provide an analysis of this YouTube video based on the limited information available. Consider what the title might suggest about the content and purpose of the video."
    )
}

pub fn id_only_prompt(prompt: &str, video_id: &str) -> String {
    format!(
        "{prompt}\n\nI'm analyzing YouTube video with ID: {video_id}.\n\nPlease note that I cannot access the actual video content, but I can provide some general information about YouTube videos and what might be in this one based on the video ID."
    )
}

pub struct YouTubeResolver {
    provider: Arc<dyn VideoInfoProvider>,
}

impl YouTubeResolver {
    /// Tiers that may fail, in the order they are tried. The id-only tier follows them.
    pub const FALLIBLE_TIERS: [ResolverTier; 2] = [ResolverTier::Structured, ResolverTier::WatchPage];

    pub fn new(provider: Arc<dyn VideoInfoProvider>) -> Self {
        Self { provider }
    }

    #[tracing::instrument(name = "youtube.resolve", skip(self, prompt))]
    pub async fn resolve(&self, video_id: &str, prompt: &str) -> ResolvedPrompt {
        for tier in Self::FALLIBLE_TIERS {
            match self.attempt(tier, video_id, prompt).await {
                Ok(resolved) => {
                    tracing::info!("[youtube] Resolved via {} tier", tier.as_str());
                    return resolved;
                }
                Err(e) => {
                    tracing::warn!("[youtube] {} tier failed: {}", tier.as_str(), e.inner);
                }
            }
        }
        tracing::warn!("[youtube] Falling back to id-only prompt");
        ResolvedPrompt {
            tier: ResolverTier::IdOnly,
            text: id_only_prompt(prompt, video_id),
            thumbnail: None,
        }
    }

    async fn attempt(
        &self,
        tier: ResolverTier,
        video_id: &str,
        prompt: &str,
    ) -> Result<ResolvedPrompt> {
        match tier {
            ResolverTier::Structured => self.structured(video_id, prompt).await,
            ResolverTier::WatchPage => self.scrape(video_id, prompt).await,
            ResolverTier::IdOnly => Ok(ResolvedPrompt {
                tier,
                text: id_only_prompt(prompt, video_id),
                thumbnail: None,
            }),
        }
    }

    async fn structured(&self, video_id: &str, prompt: &str) -> Result<ResolvedPrompt> {
        let meta = self.provider.video_info(video_id).await?;
        tracing::info!("[youtube] Video details extracted: {}", meta.title);

        // A missing thumbnail degrades the prompt, it never fails the tier.
        let thumbnail = match meta.thumbnail_url.as_deref() {
            Some(url) => match self.provider.thumbnail(url).await {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!("[youtube] Thumbnail fetch failed: {}", e.inner);
                    None
                }
            },
            None => None,
        };

        Ok(ResolvedPrompt {
            tier: ResolverTier::Structured,
            text: structured_prompt(prompt, &meta),
            thumbnail,
        })
    }

    async fn scrape(&self, video_id: &str, prompt: &str) -> Result<ResolvedPrompt> {
        let html = self.provider.watch_page(video_id).await?;
        let title = match extract_page_title(&html) {
            Some(t) => t,
            None => UNKNOWN_TITLE.to_string(),
        };
        tracing::info!("[youtube] Basic video info retrieved: {}", title);
        Ok(ResolvedPrompt {
            tier: ResolverTier::WatchPage,
            text: watch_page_prompt(prompt, video_id, &title),
            thumbnail: None,
        })
    }
}
