//! Image-to-video requests.
//!
//! No video provider contract is wired up yet: once the settings check passes
//! every request fails with [`StudioError::Unsupported`] and nothing is sent.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::MAX_UPLOAD_BYTES;
use crate::error::StudioError;
use crate::settings::Settings;

/// Output frame shape.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum AspectRatio {
    /// 16:9
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Parses the form value, eg `9:16`.
    pub fn from_form(value: &str) -> Result<Self, StudioError> {
        match value.trim() {
            "" | "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            other => Err(StudioError::BadRequest(format!(
                "Unsupported aspect ratio {other}"
            ))),
        }
    }
}

/// Still image to animate, as a `data:` URL.
#[derive(Clone, Debug)]
pub struct VideoSource {
    data_url: String,
}

impl VideoSource {
    /// Validates uploaded bytes as a PNG or JPEG and encodes them.
    pub fn from_upload(bytes: &[u8]) -> Result<Self, StudioError> {
        if bytes.len() < 4 {
            return Err(StudioError::BadRequest("Image is empty".to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StudioError::BadRequest(format!(
                "Image is larger than {} bytes",
                MAX_UPLOAD_BYTES
            )));
        }

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| {
                debug!("Failed to guess image format: {}", err);
                StudioError::BadRequest("Unrecognised image format".to_string())
            })?;
        let mime = match reader.format() {
            Some(image::ImageFormat::Png) => "image/png",
            Some(image::ImageFormat::Jpeg) => "image/jpeg",
            _ => {
                return Err(StudioError::BadRequest(
                    "Upload a PNG or JPEG image".to_string(),
                ));
            }
        };
        reader.decode().map_err(|err| {
            debug!("Failed to decode image: {}", err);
            StudioError::BadRequest("Image could not be decoded".to_string())
        })?;

        Ok(Self {
            data_url: format!(
                "data:{mime};base64,{}",
                general_purpose::STANDARD.encode(bytes)
            ),
        })
    }

    /// The encoded image.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// Animates `source` following `prompt`.
pub async fn generate_video(
    source: &VideoSource,
    prompt: &str,
    aspect_ratio: AspectRatio,
    settings: &Settings,
) -> Result<String, StudioError> {
    settings.require_api_key()?;
    settings.require_video_model()?;
    info!(
        "Video requested ({:?}, {} byte source, prompt {} chars)",
        aspect_ratio,
        source.data_url().len(),
        prompt.len()
    );
    Err(StudioError::Unsupported(
        "Video generation is not supported by the configured API yet.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn png_upload_becomes_data_url() {
        let source = VideoSource::from_upload(&tiny_png()).unwrap();
        assert!(source.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn garbage_upload_is_rejected() {
        assert!(matches!(
            VideoSource::from_upload(b"definitely not an image"),
            Err(StudioError::BadRequest(_))
        ));
        assert!(VideoSource::from_upload(b"").is_err());
    }

    #[test]
    fn aspect_ratio_from_form() {
        assert_eq!(AspectRatio::from_form("9:16").unwrap(), AspectRatio::Portrait);
        assert_eq!(AspectRatio::from_form("").unwrap(), AspectRatio::Landscape);
        assert!(AspectRatio::from_form("4:3").is_err());
    }

    #[tokio::test]
    async fn configured_request_is_unsupported() {
        let settings = Settings {
            api_key: "sk".to_string(),
            video_model: "ep-video".to_string(),
            ..Settings::default()
        };
        let source = VideoSource::from_upload(&tiny_png()).unwrap();
        let err = generate_video(&source, "pan left", AspectRatio::Landscape, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Unsupported(_)));
    }

    #[tokio::test]
    async fn unconfigured_request_names_the_missing_field() {
        let settings = Settings {
            api_key: "sk".to_string(),
            ..Settings::default()
        };
        let source = VideoSource::from_upload(&tiny_png()).unwrap();
        let err = generate_video(&source, "", AspectRatio::Portrait, &settings)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Video model"));
    }
}
