/// Gemini API endpoint and model used when no override is configured
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Environment variables holding the Gemini key, in lookup order
pub const GEMINI_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "REACT_APP_GEMINI_API_KEY"];

/// Default prompts per route
pub const DEFAULT_VIDEO_PROMPT: &str = "Analyze this video. Identify key frames, objects, people, and provide a scene classification. Transcribe any speech.";
pub const DEFAULT_VIDEO_URL_PROMPT: &str = "Analyze this video";
pub const DEFAULT_AUDIO_PROMPT: &str =
    "Transcribe this audio. Identify the speaker and any background noises.";
pub const DEFAULT_YOUTUBE_PROMPT: &str = "Analyze this YouTube video";
pub const SMOKE_TEST_PROMPT: &str = "Say hello and confirm that you are working correctly.";

/// Media routes ask for plain text so the reshaper has something to work with
pub const MEDIA_RESPONSE_MIME_TYPE: &str = "text/plain";

pub const UNEXPECTED_RESPONSE_FORMAT: &str = "Unexpected response format";

/// YouTube scraping
pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const YOUTUBE_TITLE_SUFFIX: &str = " - YouTube";
pub const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";
pub const DEFAULT_THUMBNAIL_MIME: &str = "image/jpeg";

/// Per-field placeholders for best-effort video metadata
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const NO_DESCRIPTION: &str = "No description available";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";
pub const UNKNOWN_DATE: &str = "Unknown Date";
pub const UNKNOWN_COUNT: &str = "Unknown";
pub const UNKNOWN_DURATION: &str = "Unknown Duration";
pub const NO_KEYWORDS: &str = "None";
pub const UNKNOWN_CATEGORY: &str = "Unknown Category";

/// Upload limits
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_REMOTE_BYTES: usize = 50 * 1024 * 1024;
/// Headroom on top of the per-file cap for the other multipart fields
pub const FORM_FIELD_HEADROOM_BYTES: usize = 64 * 1024;
pub const DEFAULT_UPLOAD_MIME: &str = "application/octet-stream";

/// Reshaper thresholds
pub const HEADER_MAX_CHARS: usize = 50;

/// Response headers
pub const REQUEST_ID_HEADER: &str = "x-prism-request-id";
pub const RESOLVER_TIER_HEADER: &str = "x-prism-resolver-tier";

/// User-facing guidance for classified upstream failures
pub const OVERLOADED_ERROR: &str =
    "The Gemini model is currently overloaded with requests. This is a temporary issue.";
pub const OVERLOADED_MESSAGE: &str = "Please try again in a few minutes. This is a common issue with popular AI models during peak usage times.";
pub const QUOTA_ERROR: &str = "API quota exceeded. The Gemini API has rate limits for free usage.";
pub const QUOTA_MESSAGE: &str =
    "Please try again later or consider upgrading to a paid tier for higher quotas.";
