//! Shared constants for prompts, placeholders and defaults
//!

use std::path::PathBuf;
use std::sync::LazyLock;

/// Where the settings file lives unless told otherwise
pub static SETTINGS_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| PathBuf::from("./comiccraft_settings.json"));

/// Default OpenAI-compatible base URL (Volcengine Ark)
pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Default language for captions and chat replies
pub const DEFAULT_CAPTION_LANGUAGE: &str = "English";

/// Caption used when the model leaves one out
pub const DEFAULT_CAPTION: &str = "no narration";

/// Visual prompt used when the model leaves one out
pub const DEFAULT_VISUAL_PROMPT: &str = "comic scene";

/// Sampling temperature for the storyboard request
pub const PANEL_TEMPERATURE: f32 = 0.7;

/// Prepended to every image prompt
pub const IMAGE_STYLE_PREAMBLE: &str = "Comic book style, highly detailed, vibrant colors.";

/// The only size the image endpoint is asked for
pub const IMAGE_SIZE: &str = "1024x1024";

/// Returned by the chat session when it isn't configured
pub const CHAT_NOT_CONFIGURED: &str =
    "Please configure your API key and text model in settings first.";

/// Stored as the reply when the model answers without content
pub const CHAT_EMPTY_REPLY: &str = "No reply";

/// Returned by the chat session when the request never reached the API
pub const CHAT_NETWORK_FAILURE: &str = "Error: network request failed (possibly blocked by a \
cross-origin policy or proxy). Check the server logs for details.";

/// Generic prefix for failed chat requests
pub const CHAT_ERROR_PREFIX: &str = "Error: ";

/// Used when a failed chat response carries no message
pub const CHAT_GENERIC_FAILURE: &str = "Chat request failed";

/// Largest upload accepted for the video source image
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
