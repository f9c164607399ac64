//! API settings and the file-backed store that persists them.
//!
//! Core operations never read the store themselves: the caller hands them a
//! [`Settings`] snapshot taken at the start of each operation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::constants::{DEFAULT_BASE_URL, DEFAULT_CAPTION_LANGUAGE};
use crate::error::StudioError;

/// Credentials and endpoint identifiers for the remote model API.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Bearer credential sent with every request.
    pub api_key: String,
    /// OpenAI-compatible base URL, eg `https://ark.cn-beijing.volces.com/api/v3`.
    pub base_url: String,
    /// Endpoint id of the text model (storyboards and chat).
    pub text_model: String,
    /// Endpoint id of the image model.
    pub image_model: String,
    /// Endpoint id of the video model.
    pub video_model: String,
    /// Human language for captions and chat replies.
    pub caption_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: String::new(),
            image_model: String::new(),
            video_model: String::new(),
            caption_language: DEFAULT_CAPTION_LANGUAGE.to_string(),
        }
    }
}

fn required<'a>(value: &'a str, name: &str) -> Result<&'a str, StudioError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StudioError::Configuration(format!(
            "{name} is not configured; set it in settings"
        )));
    }
    Ok(value)
}

impl Settings {
    /// The credential, or a configuration error naming it.
    pub fn require_api_key(&self) -> Result<&str, StudioError> {
        required(&self.api_key, "API key")
    }

    /// The text model id, or a configuration error naming it.
    pub fn require_text_model(&self) -> Result<&str, StudioError> {
        required(&self.text_model, "Text model endpoint ID")
    }

    /// The image model id, or a configuration error naming it.
    pub fn require_image_model(&self) -> Result<&str, StudioError> {
        required(&self.image_model, "Image model endpoint ID")
    }

    /// The video model id, or a configuration error naming it.
    pub fn require_video_model(&self) -> Result<&str, StudioError> {
        required(&self.video_model, "Video model endpoint ID")
    }

    /// Base URL without trailing slashes, checked to be an absolute http(s) URL.
    pub fn endpoint_base(&self) -> Result<String, StudioError> {
        let base = required(&self.base_url, "Base URL")?.trim_end_matches('/');
        let parsed = Url::parse(base)
            .map_err(|err| StudioError::Configuration(format!("Base URL is invalid: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StudioError::Configuration(format!(
                "Base URL must use http or https, got {}",
                parsed.scheme()
            )));
        }
        Ok(base.to_string())
    }

    /// Language for captions, falling back to the default when blank.
    pub fn caption_language(&self) -> &str {
        let language = self.caption_language.trim();
        if language.is_empty() {
            DEFAULT_CAPTION_LANGUAGE
        } else {
            language
        }
    }

    /// The view handed to the browser: everything except the key itself.
    pub fn redacted(&self) -> RedactedSettings {
        RedactedSettings {
            has_api_key: !self.api_key.trim().is_empty(),
            base_url: self.base_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            video_model: self.video_model.clone(),
            caption_language: self.caption_language.clone(),
        }
    }

    /// Applies an update from the settings form. A blank key keeps the stored one.
    pub fn merged_with(&self, mut update: Settings) -> Settings {
        if update.api_key.trim().is_empty() {
            update.api_key = self.api_key.clone();
        }
        update.api_key = update.api_key.trim().to_string();
        update.base_url = update.base_url.trim().to_string();
        update.text_model = update.text_model.trim().to_string();
        update.image_model = update.image_model.trim().to_string();
        update.video_model = update.video_model.trim().to_string();
        update
    }
}

/// Settings as shown to the front-end.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedSettings {
    /// Whether a credential is stored.
    pub has_api_key: bool,
    /// See [`Settings::base_url`].
    pub base_url: String,
    /// See [`Settings::text_model`].
    pub text_model: String,
    /// See [`Settings::image_model`].
    pub image_model: String,
    /// See [`Settings::video_model`].
    pub video_model: String,
    /// See [`Settings::caption_language`].
    pub caption_language: String,
}

/// Loads and saves [`Settings`] as JSON on disk.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// A store backed by the file at `path`; nothing is read until [`Self::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the settings live.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings, using defaults for a missing file or missing fields.
    pub async fn load(&self) -> Result<Settings, StudioError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No settings file at {}, using defaults",
                    self.path.display()
                );
                return Ok(Settings::default());
            }
            Err(err) => return Err(err.into()),
        };
        let settings: Settings = serde_json::from_str(&raw).map_err(|err| {
            StudioError::Configuration(format!(
                "Settings file {} is not valid JSON: {err}",
                self.path.display()
            ))
        })?;
        debug!("Loaded settings from {}", self.path.display());
        Ok(settings)
    }

    /// Writes the settings, creating the parent directory if needed.
    pub async fn save(&self, settings: &Settings) -> Result<(), StudioError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(settings)?;
        tokio::fs::write(&self.path, body).await?;
        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Settings {
        Settings {
            api_key: "sk-test".to_string(),
            text_model: "ep-text".to_string(),
            image_model: "ep-image".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn missing_fields_are_named() {
        let settings = Settings::default();
        let err = settings.require_api_key().unwrap_err();
        assert!(matches!(err, StudioError::Configuration(_)));
        assert!(err.to_string().contains("API key"));

        let err = settings.require_image_model().unwrap_err();
        assert!(err.to_string().contains("Image model"));
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let settings = Settings {
            text_model: "   ".to_string(),
            ..configured()
        };
        assert!(settings.require_text_model().is_err());
    }

    #[test]
    fn endpoint_base_trims_trailing_slash() {
        let settings = Settings {
            base_url: "https://example.org/api/v3/".to_string(),
            ..configured()
        };
        assert_eq!(settings.endpoint_base().unwrap(), "https://example.org/api/v3");
    }

    #[test]
    fn endpoint_base_rejects_garbage() {
        let settings = Settings {
            base_url: "not a url".to_string(),
            ..configured()
        };
        assert!(matches!(
            settings.endpoint_base(),
            Err(StudioError::Configuration(_))
        ));
        let settings = Settings {
            base_url: "ftp://example.org".to_string(),
            ..configured()
        };
        assert!(settings.endpoint_base().is_err());
    }

    #[test]
    fn partial_json_is_merged_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"apiKey":"sk-1"}"#).unwrap();
        assert_eq!(settings.api_key, "sk-1");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.caption_language(), DEFAULT_CAPTION_LANGUAGE);
    }

    #[test]
    fn blank_key_in_update_keeps_stored_key() {
        let current = configured();
        let update = Settings {
            api_key: String::new(),
            text_model: " ep-new ".to_string(),
            ..Settings::default()
        };
        let merged = current.merged_with(update);
        assert_eq!(merged.api_key, "sk-test");
        assert_eq!(merged.text_model, "ep-new");
    }

    #[test]
    fn redacted_view_hides_key() {
        let redacted = configured().redacted();
        assert!(redacted.has_api_key);
        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("sk-test"));
        assert!(json.contains("hasApiKey"));
    }

    #[tokio::test]
    async fn store_round_trips_and_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));

        assert_eq!(store.load().await.unwrap(), Settings::default());

        store.save(&configured()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), configured());
    }

    #[tokio::test]
    async fn store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = SettingsStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StudioError::Configuration(_)));
    }
}
