//! Web front-end: the studio page plus the JSON API it talks to.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::chat::{ChatSession, default_instruction};
use crate::constants::MAX_UPLOAD_BYTES;
use crate::error::StudioError;
use crate::panels::Storyboard;
use crate::settings::{Settings, SettingsStore};

mod api;
mod prelude;
mod views;

use api::{
    chat_history_handler, chat_send_handler, create_image_handler, create_panels_handler,
    create_video_handler, get_settings_handler, list_panels_handler, panel_image_handler,
    panel_images_handler, save_settings_handler,
};
use views::{index_handler, script_handler, styles_handler};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    settings: Arc<RwLock<Settings>>,
    store: SettingsStore,
    http: reqwest::Client,
    storyboard: Arc<RwLock<Storyboard>>,
    /// Replaced whole on settings change. The outer lock is never held across a send.
    chat: Arc<RwLock<Arc<Mutex<ChatSession>>>>,
}

impl AppState {
    fn new(store: SettingsStore, settings: Settings, http: reqwest::Client) -> Self {
        let chat = ChatSession::new(default_instruction(settings.caption_language()));
        Self {
            settings: Arc::new(RwLock::new(settings)),
            store,
            http,
            storyboard: Arc::new(RwLock::new(Storyboard::default())),
            chat: Arc::new(RwLock::new(Arc::new(Mutex::new(chat)))),
        }
    }

    /// Settings as of now; operations take one snapshot up front.
    pub(crate) async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// The live chat session.
    pub(crate) async fn chat_session(&self) -> Arc<Mutex<ChatSession>> {
        self.chat.read().await.clone()
    }

    /// Persists new settings and starts a fresh chat session against them.
    pub(crate) async fn replace_settings(&self, settings: Settings) -> Result<(), StudioError> {
        self.store.save(&settings).await?;
        let session = ChatSession::new(default_instruction(settings.caption_language()));
        *self.settings.write().await = settings;
        *self.chat.write().await = Arc::new(Mutex::new(session));
        info!("Settings replaced, chat session restarted");
        Ok(())
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/styles.css", get(styles_handler))
        .route("/static/app.js", get(script_handler))
        .route(
            "/api/settings",
            get(get_settings_handler).post(save_settings_handler),
        )
        .route(
            "/api/panels",
            get(list_panels_handler).post(create_panels_handler),
        )
        .route("/api/panels/images", post(panel_images_handler))
        .route("/api/panels/{id}/image", post(panel_image_handler))
        .route("/api/images", post(create_image_handler))
        .route(
            "/api/video",
            post(create_video_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route("/api/chat", get(chat_history_handler).post(chat_send_handler))
}

/// Loads the settings and serves the studio until the process is stopped.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    store: SettingsStore,
) -> Result<(), anyhow::Error> {
    let settings = store.load().await?;
    if settings.require_api_key().is_err() {
        info!(
            "No API key configured yet; open the settings panel or edit {}",
            store.path().display()
        );
    }
    let state = AppState::new(store, settings, reqwest::Client::new());
    let app = create_router().with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
