#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::IntoResponse;
use axum::routing::post;
use comiccraft::settings::Settings;
use serde_json::{Value, json};

/// One canned reply from the fake API.
#[derive(Clone, Debug)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
}

impl Canned {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    /// A chat completion whose single choice carries `content`.
    pub fn chat(content: &str) -> Self {
        Self::ok(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
    }

    /// An image generation returning one URL.
    pub fn image(url: &str) -> Self {
        Self::ok(json!({"data": [{"url": url}]}))
    }

    pub fn api_error(status: StatusCode, message: &str) -> Self {
        Self::ok(json!({"error": {"message": message}})).with_status(status)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// What the fake API saw.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeState {
    chat: Canned,
    image: Canned,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

pub struct FakeApi {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeApi {
    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Settings with every field filled in, pointing at this server.
    pub fn settings(&self) -> Settings {
        configured_settings(&self.base_url)
    }
}

fn record(state: &FakeState, path: &str, headers: &HeaderMap, body: &str) {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(body).unwrap_or(Value::Null);
    state.seen.lock().unwrap().push(Recorded {
        path: path.to_string(),
        authorization,
        body,
    });
}

async fn chat_route(
    State(state): State<FakeState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    record(&state, "/chat/completions", &headers, &body);
    (state.chat.status, state.chat.body.clone())
}

async fn image_route(
    State(state): State<FakeState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    record(&state, "/images/generations", &headers, &body);
    (state.image.status, state.image.body.clone())
}

/// Starts a fake OpenAI-compatible API on an ephemeral port.
pub async fn fake_api(chat: Canned, image: Canned) -> FakeApi {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        chat,
        image,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/chat/completions", post(chat_route))
        .route("/images/generations", post(image_route))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    FakeApi {
        base_url: format!("http://{addr}"),
        seen,
    }
}

/// A base URL nothing listens on, so requests fail before any reply.
pub async fn closed_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn configured_settings(base_url: &str) -> Settings {
    Settings {
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        text_model: "text-endpoint".to_string(),
        image_model: "image-endpoint".to_string(),
        video_model: "video-endpoint".to_string(),
        caption_language: "English".to_string(),
    }
}
