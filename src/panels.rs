//! Story to comic panel breakdown.
//!
//! The text model is asked for a bare JSON array but rarely manages it: replies
//! arrive wrapped in code fences or padded with prose. [`extract_panels`] does
//! a best-effort recovery: take the span from the first `[` to the last `]`,
//! otherwise strip fence markers, then parse. Anything that still isn't a JSON
//! array is a [`StudioError::Parse`]. Prose containing brackets before the
//! payload will confuse the span scan.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::client::{ApiClient, ChatCompletionRequest, WireMessage};
use crate::constants::{DEFAULT_CAPTION, DEFAULT_VISUAL_PROMPT, PANEL_TEMPERATURE};
use crate::error::StudioError;
use crate::settings::Settings;

// Opening fence with an optional language tag, or a bare fence.
#[allow(clippy::unwrap_used)]
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*[ \t]*(?:\r?\n|$)|```").unwrap());

/// One panel of a comic breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComicPanel {
    /// Unique within the batch it was generated in.
    pub id: String,
    /// Narration shown under the panel.
    pub caption: String,
    /// Description handed to the image model.
    pub visual_prompt: String,
    /// Generated image, once there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Set while an image request for this panel is in flight.
    pub is_loading: bool,
}

fn system_instruction(language: &str) -> String {
    format!(
        "You are a professional comic scriptwriter. Your job is to adapt the user's story \
into a compelling visual comic storyboard. Output only a raw JSON array: no markdown code \
fences (such as ```json ... ```) and no explanatory text. Each element is an object with \
two string fields: \"caption\", the panel narration written in {language}, and \
\"visual_prompt\", a detailed English description of the scene for an image model."
    )
}

fn user_instruction(story: &str, language: &str) -> String {
    format!(
        r#"Break the following story into 4 to 6 distinct visual comic panels.
Reply strictly in this JSON format with no additional text:
[
  {{ "caption": "Narration in {language}...", "visual_prompt": "English visual description..." }},
  {{ "caption": "Narration in {language}...", "visual_prompt": "English visual description..." }}
]

Story:
{story}"#
    )
}

/// Narrows a model reply down to the text that should be the JSON array.
pub fn recover_json_candidate(text: &str) -> String {
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']'))
        && start < end
    {
        return text[start..=end].to_string();
    }
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

fn text_field(value: &Value, key: &str, fallback: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Parses a model reply into panels, in reply order. `batch` seeds the ids.
pub fn extract_panels(text: &str, batch: i64) -> Result<Vec<ComicPanel>, StudioError> {
    let candidate = recover_json_candidate(text);
    let parsed: Value = serde_json::from_str(&candidate).map_err(|err| {
        debug!("Panel JSON did not parse ({err}); cleaned text was: {candidate}");
        StudioError::Parse(
            "The model's output was not valid structured data and could not be read as JSON. \
Please try again."
                .to_string(),
        )
    })?;

    let Value::Array(items) = parsed else {
        return Err(StudioError::Parse(
            "The model's reply is not an array of panels. Please try again.".to_string(),
        ));
    };

    Ok(items
        .iter()
        .enumerate()
        .map(|(index, item)| ComicPanel {
            id: format!("panel-{batch}-{index}"),
            caption: text_field(item, "caption", DEFAULT_CAPTION),
            visual_prompt: text_field(item, "visual_prompt", DEFAULT_VISUAL_PROMPT),
            image_url: None,
            is_loading: false,
        })
        .collect())
}

/// Asks the text model to break `story` into panels.
#[instrument(skip_all, fields(story_len = story.len()))]
pub async fn generate_panels(
    http: &Client,
    story: &str,
    settings: &Settings,
) -> Result<Vec<ComicPanel>, StudioError> {
    settings.require_api_key()?;
    let model = settings.require_text_model()?;
    let client = ApiClient::new(http.clone(), settings)?;

    let language = settings.caption_language();
    let system = system_instruction(language);
    let user = user_instruction(story, language);
    let request = ChatCompletionRequest {
        model,
        messages: vec![
            WireMessage {
                role: "system",
                content: &system,
            },
            WireMessage {
                role: "user",
                content: &user,
            },
        ],
        temperature: Some(PANEL_TEMPERATURE),
        stream: false,
    };

    let text = client
        .chat_completion(&request, |status| {
            format!("API request failed with status {status}")
        })
        .await?
        .unwrap_or_default();
    debug!("Model raw response: {text}");

    let panels = extract_panels(&text, Utc::now().timestamp_millis())?;
    info!("Story broken into {} panels", panels.len());
    Ok(panels)
}

/// The current panel batch, as held by the web front-end.
#[derive(Clone, Debug, Default)]
pub struct Storyboard {
    panels: Vec<ComicPanel>,
}

impl Storyboard {
    /// Panels in display order.
    pub fn panels(&self) -> &[ComicPanel] {
        &self.panels
    }

    /// Swaps in a freshly generated batch.
    pub fn replace(&mut self, panels: Vec<ComicPanel>) {
        self.panels = panels;
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut ComicPanel, StudioError> {
        self.panels
            .iter_mut()
            .find(|panel| panel.id == id)
            .ok_or_else(|| StudioError::NotFound(format!("No panel with id {id}")))
    }

    /// Flags the panel as loading and hands back its prompt.
    pub fn begin_image(&mut self, id: &str) -> Result<String, StudioError> {
        let panel = self.find_mut(id)?;
        panel.is_loading = true;
        Ok(panel.visual_prompt.clone())
    }

    /// Records the outcome of an image request. A panel that vanished with an
    /// older batch is silently skipped.
    pub fn finish_image(&mut self, id: &str, image_url: Option<String>) -> Option<&ComicPanel> {
        let panel = self.find_mut(id).ok()?;
        panel.is_loading = false;
        if image_url.is_some() {
            panel.image_url = image_url;
        }
        Some(&*panel)
    }

    /// Ids of panels still waiting for an image, in order.
    pub fn pending_images(&self) -> Vec<String> {
        self.panels
            .iter()
            .filter(|panel| panel.image_url.is_none())
            .map(|panel| panel.id.clone())
            .collect()
    }
}
