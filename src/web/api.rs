//! JSON endpoints used by the studio page.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::prelude::*;
use crate::chat::ChatMessage;
use crate::images::{ImageSize, generate_image};
use crate::panels::{ComicPanel, Storyboard, generate_panels};
use crate::settings::{RedactedSettings, Settings};
use crate::video::{AspectRatio, VideoSource, generate_video};

#[derive(Deserialize)]
pub(crate) struct StoryForm {
    story: String,
}

#[derive(Deserialize, Default)]
pub(crate) struct SizeForm {
    #[serde(default)]
    size: ImageSize,
}

#[derive(Deserialize)]
pub(crate) struct ImageForm {
    prompt: String,
    #[serde(default)]
    size: ImageSize,
}

#[derive(Deserialize)]
pub(crate) struct ChatForm {
    message: String,
}

#[derive(Serialize)]
pub(crate) struct MediaUrl {
    url: String,
}

#[derive(Serialize)]
pub(crate) struct ChatReply {
    reply: String,
    history: Vec<ChatMessage>,
}

pub(crate) async fn get_settings_handler(State(state): State<AppState>) -> Json<RedactedSettings> {
    Json(state.settings().await.redacted())
}

/// Saves the settings form; a blank API key keeps the stored one.
#[instrument(skip_all)]
pub(crate) async fn save_settings_handler(
    State(state): State<AppState>,
    Json(update): Json<Settings>,
) -> Result<Json<RedactedSettings>, StudioError> {
    let merged = state.settings().await.merged_with(update);
    if !merged.base_url.is_empty() {
        merged.endpoint_base()?;
    }
    let redacted = merged.redacted();
    state.replace_settings(merged).await?;
    Ok(Json(redacted))
}

pub(crate) async fn list_panels_handler(State(state): State<AppState>) -> Json<Vec<ComicPanel>> {
    Json(state.storyboard.read().await.panels().to_vec())
}

/// Breaks a story into a new panel batch, replacing the current one.
#[instrument(skip_all)]
pub(crate) async fn create_panels_handler(
    State(state): State<AppState>,
    Json(form): Json<StoryForm>,
) -> Result<Json<Vec<ComicPanel>>, StudioError> {
    let story = form.story.trim();
    if story.is_empty() {
        return Err(StudioError::BadRequest("Write a story first".to_string()));
    }
    let settings = state.settings().await;
    let panels = generate_panels(&state.http, story, &settings).await?;
    state.storyboard.write().await.replace(panels.clone());
    Ok(Json(panels))
}

/// Clears a panel's loading flag if its request is dropped before finishing.
struct LoadingGuard<'a> {
    storyboard: &'a Arc<RwLock<Storyboard>>,
    id: &'a str,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("Image request for {} dropped, clearing its loading flag", self.id);
        if let Ok(mut board) = self.storyboard.try_write() {
            board.finish_image(self.id, None);
        } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let storyboard = self.storyboard.clone();
            let id = self.id.to_string();
            handle.spawn(async move {
                storyboard.write().await.finish_image(&id, None);
            });
        }
    }
}

/// Generates the image for one panel. The storyboard lock is not held while
/// the request is in flight, so panels can be illustrated concurrently.
pub(super) async fn illustrate_panel(
    state: &AppState,
    settings: &Settings,
    id: &str,
    size: ImageSize,
) -> Result<ComicPanel, StudioError> {
    let prompt = state.storyboard.write().await.begin_image(id)?;
    let mut guard = LoadingGuard {
        storyboard: &state.storyboard,
        id,
        armed: true,
    };
    let result = generate_image(&state.http, &prompt, size, settings).await;

    let mut board = state.storyboard.write().await;
    guard.armed = false;
    match result {
        Ok(url) => board
            .finish_image(id, Some(url))
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("Panel {id} was replaced"))),
        Err(err) => {
            board.finish_image(id, None);
            Err(err)
        }
    }
}

#[instrument(skip(state, form))]
pub(crate) async fn panel_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<SizeForm>,
) -> Result<Json<ComicPanel>, StudioError> {
    let settings = state.settings().await;
    let panel = illustrate_panel(&state, &settings, &id, form.size).await?;
    Ok(Json(panel))
}

/// Illustrates every panel that has no image yet, one after another.
#[instrument(skip_all)]
pub(crate) async fn panel_images_handler(
    State(state): State<AppState>,
    Json(form): Json<SizeForm>,
) -> Result<Json<Vec<ComicPanel>>, StudioError> {
    let settings = state.settings().await;
    let pending = state.storyboard.read().await.pending_images();
    info!("Illustrating {} panels", pending.len());
    for id in pending {
        illustrate_panel(&state, &settings, &id, form.size).await?;
    }
    Ok(Json(state.storyboard.read().await.panels().to_vec()))
}

#[instrument(skip_all)]
pub(crate) async fn create_image_handler(
    State(state): State<AppState>,
    Json(form): Json<ImageForm>,
) -> Result<Json<MediaUrl>, StudioError> {
    if form.prompt.trim().is_empty() {
        return Err(StudioError::BadRequest("Describe the image first".to_string()));
    }
    let settings = state.settings().await;
    let url = generate_image(&state.http, &form.prompt, form.size, &settings).await?;
    Ok(Json(MediaUrl { url }))
}

/// Takes a multipart upload with `image`, `prompt` and `aspect_ratio` fields.
#[instrument(skip_all)]
pub(crate) async fn create_video_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MediaUrl>, StudioError> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut prompt = String::new();
    let mut aspect_ratio = AspectRatio::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "image" => image_bytes = Some(field.bytes().await?.to_vec()),
            "prompt" => prompt = field.text().await?,
            "aspect_ratio" => aspect_ratio = AspectRatio::from_form(&field.text().await?)?,
            other => debug!("Ignoring form field {other}"),
        }
    }

    let image_bytes = image_bytes
        .ok_or_else(|| StudioError::BadRequest("Upload an image to animate".to_string()))?;
    let source = VideoSource::from_upload(&image_bytes)?;
    let settings = state.settings().await;
    let url = generate_video(&source, &prompt, aspect_ratio, &settings).await?;
    Ok(Json(MediaUrl { url }))
}

pub(crate) async fn chat_history_handler(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    let session = state.chat_session().await;
    let history = session.lock().await.history().to_vec();
    Json(history)
}

/// Chat never fails at the HTTP level; problems come back as the reply text.
#[instrument(skip_all)]
pub(crate) async fn chat_send_handler(
    State(state): State<AppState>,
    Json(form): Json<ChatForm>,
) -> Result<Json<ChatReply>, StudioError> {
    let message = form.message.trim();
    if message.is_empty() {
        return Err(StudioError::BadRequest("Type a message first".to_string()));
    }
    let settings = state.settings().await;
    let session = state.chat_session().await;
    let mut session = session.lock().await;
    let reply = session.send_message(&state.http, &settings, message).await;
    Ok(Json(ChatReply {
        reply,
        history: session.history().to_vec(),
    }))
}
