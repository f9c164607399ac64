//! Thin client for the OpenAI-compatible model API.
//!
//! Every studio operation goes through [`ApiClient`]: one POST, bearer auth,
//! JSON in and out, and failures sorted into [`StudioError`] classes.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error};

use crate::error::StudioError;
use crate::settings::Settings;

// -----------------------------
// Chat completions
// -----------------------------

/// Request body for POST /chat/completions
#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest<'a> {
    /// Endpoint id of the text model.
    pub model: &'a str,
    /// Full conversation, oldest first.
    pub messages: Vec<WireMessage<'a>>,
    /// Sampling temperature, left to the server when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Always false; replies are delivered in one piece.
    pub stream: bool,
}

/// A message as the chat completions endpoint expects it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WireMessage<'a> {
    /// `system`, `user` or `assistant`.
    pub role: &'a str,
    /// Message text.
    pub content: &'a str,
}

/// Builds the error message for a failed response that carries no `error.message`.
pub type FailureMessage = fn(u16) -> String;

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize, Debug, Default)]
struct ChatCompletionResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug, Default)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize, Debug, Default)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// -----------------------------
// Images
// -----------------------------

/// Request body for POST /images/generations
#[derive(Serialize, Debug)]
pub struct ImagesGenerateRequest<'a> {
    /// Endpoint id of the image model.
    pub model: &'a str,
    /// Full prompt, style preamble included.
    pub prompt: &'a str,
    /// Number of images; the studio always asks for one.
    pub n: u8,
    /// Wire size, eg `1024x1024`.
    pub size: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct ImagesGenerateResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

// -----------------------------
// Errors
// -----------------------------

#[derive(Deserialize, Debug, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Pulls `error.message` out of an error response body, if there is one.
pub(crate) fn upstream_error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|body| body.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

/// Sends requests for one settings snapshot.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Builds a client from a settings snapshot. Fails if the credential or base URL is unusable.
    pub fn new(http: Client, settings: &Settings) -> Result<Self, StudioError> {
        let api_key = settings.require_api_key()?.to_string();
        let base_url = settings.endpoint_base()?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Runs a non-streaming chat completion and returns `choices[0].message.content`.
    ///
    /// `failure` words the error when a failed response says nothing useful.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest<'_>,
        failure: FailureMessage,
    ) -> Result<Option<String>, StudioError> {
        let response: ChatCompletionResponse = self
            .post_json("chat/completions", request, failure)
            .await?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }

    /// Generates images and returns the first URL in `data`, if any.
    pub async fn image_generation(
        &self,
        request: &ImagesGenerateRequest<'_>,
    ) -> Result<Option<String>, StudioError> {
        let response: ImagesGenerateResponse = self
            .post_json("images/generations", request, |status| {
                format!("Image generation failed: {status}")
            })
            .await?;
        Ok(response.data.into_iter().next().and_then(|image| image.url))
    }

    async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        failure: FailureMessage,
    ) -> Result<T, StudioError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {url}");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| StudioError::network(&err))?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|err| StudioError::network(&err))?;

        if !status.is_success() {
            error!(
                "{url} answered {status}: {}",
                String::from_utf8_lossy(&bytes)
            );
            let message =
                upstream_error_message(&bytes).unwrap_or_else(|| failure(status.as_u16()));
            return Err(StudioError::Api(message));
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            error!("Unparseable body from {url}: {err}");
            StudioError::Parse(format!("The API returned an unexpected response body: {err}"))
        })
    }
}
