//! Single image generation for panels and the image studio.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::client::{ApiClient, ImagesGenerateRequest};
use crate::constants::{IMAGE_SIZE, IMAGE_STYLE_PREAMBLE};
use crate::error::StudioError;
use crate::settings::Settings;

/// Size options offered by the front-end.
///
/// The backend only serves one resolution, so every option maps to it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum ImageSize {
    /// Nominal 1K
    #[default]
    #[serde(rename = "1K")]
    Size1K,
    /// Nominal 2K
    #[serde(rename = "2K")]
    Size2K,
    /// Nominal 4K
    #[serde(rename = "4K")]
    Size4K,
}

impl ImageSize {
    /// Value sent as `size` on the wire.
    pub fn as_wire(self) -> &'static str {
        IMAGE_SIZE
    }
}

/// Prompt actually sent to the image model.
pub fn styled_prompt(prompt: &str) -> String {
    format!("{IMAGE_STYLE_PREAMBLE} {}", prompt.trim())
}

/// Generates one image and returns its URL.
#[instrument(skip_all, fields(size = ?size))]
pub async fn generate_image(
    http: &Client,
    prompt: &str,
    size: ImageSize,
    settings: &Settings,
) -> Result<String, StudioError> {
    settings.require_api_key()?;
    let model = settings.require_image_model()?;
    let client = ApiClient::new(http.clone(), settings)?;

    let full_prompt = styled_prompt(prompt);
    let request = ImagesGenerateRequest {
        model,
        prompt: &full_prompt,
        n: 1,
        size: size.as_wire(),
    };

    let url = client
        .image_generation(&request)
        .await?
        .ok_or_else(|| StudioError::Api("No image URL returned".to_string()))?;
    info!("Image generated");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_size_maps_to_the_same_wire_value() {
        for size in [ImageSize::Size1K, ImageSize::Size2K, ImageSize::Size4K] {
            assert_eq!(size.as_wire(), "1024x1024");
        }
    }

    #[test]
    fn sizes_deserialize_from_front_end_labels() {
        let size: ImageSize = serde_json::from_str("\"4K\"").unwrap();
        assert_eq!(size, ImageSize::Size4K);
    }

    #[test]
    fn preamble_is_prepended() {
        assert_eq!(
            styled_prompt("a robot reading"),
            "Comic book style, highly detailed, vibrant colors. a robot reading"
        );
    }

    #[tokio::test]
    async fn missing_image_model_is_reported_before_any_request() {
        let settings = Settings {
            api_key: "sk-test".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            ..Settings::default()
        };
        let err = generate_image(&Client::new(), "x", ImageSize::Size1K, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Configuration(_)));
        assert!(err.to_string().contains("Image model"));
    }
}
