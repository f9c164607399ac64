//! Conversational assistant session.
//!
//! A session owns an append-only history that starts with one system entry.
//! Every send replays the whole history. Failures never escape: they come
//! back as reply text so the chat widget always has something to show.

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::client::{ApiClient, ChatCompletionRequest, WireMessage};
use crate::constants::{
    CHAT_EMPTY_REPLY, CHAT_ERROR_PREFIX, CHAT_GENERIC_FAILURE, CHAT_NETWORK_FAILURE,
    CHAT_NOT_CONFIGURED,
};
use crate::error::StudioError;
use crate::settings::Settings;

/// Who wrote a history entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The seeded instruction; never shown to callers.
    System,
    /// The person typing.
    User,
    /// The remote model.
    Model,
}

impl ChatRole {
    /// Role name on the chat completions wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Model => "assistant",
        }
    }
}

/// One history entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Author of the entry.
    pub role: ChatRole,
    /// Entry text.
    pub text: String,
}

/// Where a session is in its request cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// Ready for the next message.
    Idle,
    /// A request is in flight.
    AwaitingReply,
}

/// Instruction used by the studio's assistant widget.
pub fn default_instruction(language: &str) -> String {
    format!(
        "You are a helpful AI assistant for a creative comic-making studio. \
Always answer the user's questions in {language}."
    )
}

/// A linear conversation with the configured text model.
///
/// Calls must not overlap: `send_message` takes `&mut self`, so callers that
/// share a session have to serialize access themselves.
#[derive(Clone, Debug)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    state: SessionState,
}

impl ChatSession {
    /// Starts a session seeded with `system_instruction`.
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            history: vec![ChatMessage {
                role: ChatRole::System,
                text: system_instruction.into(),
            }],
            state: SessionState::Idle,
        }
    }

    /// The seeded instruction.
    pub fn system_instruction(&self) -> &str {
        &self.history[0].text
    }

    /// User and model entries, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history[1..]
    }

    /// Current request state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sends `text` with the full history and returns the reply.
    ///
    /// Without a key or text model nothing is sent or recorded. On failure the
    /// user entry stays in history and no model entry is added.
    #[instrument(skip_all, fields(history_len = self.history.len()))]
    pub async fn send_message(&mut self, http: &Client, settings: &Settings, text: &str) -> String {
        let (Ok(_), Ok(model)) = (settings.require_api_key(), settings.require_text_model())
        else {
            info!("Chat used without a configured key or model");
            return CHAT_NOT_CONFIGURED.to_string();
        };

        self.history.push(ChatMessage {
            role: ChatRole::User,
            text: text.to_string(),
        });
        self.state = SessionState::AwaitingReply;
        let result = self.request_reply(http, settings, model).await;
        self.state = SessionState::Idle;

        match result {
            Ok(reply) => {
                let reply = reply
                    .filter(|reply| !reply.is_empty())
                    .unwrap_or_else(|| CHAT_EMPTY_REPLY.to_string());
                self.history.push(ChatMessage {
                    role: ChatRole::Model,
                    text: reply.clone(),
                });
                reply
            }
            Err(StudioError::Network(_)) => CHAT_NETWORK_FAILURE.to_string(),
            Err(StudioError::Api(message)) => format!("{CHAT_ERROR_PREFIX}{message}"),
            Err(err) => {
                error!("Chat error: {err}");
                format!("{CHAT_ERROR_PREFIX}{err}")
            }
        }
    }

    async fn request_reply(
        &self,
        http: &Client,
        settings: &Settings,
        model: &str,
    ) -> Result<Option<String>, StudioError> {
        let client = ApiClient::new(http.clone(), settings)?;
        let request = ChatCompletionRequest {
            model,
            messages: self
                .history
                .iter()
                .map(|entry| WireMessage {
                    role: entry.role.wire_name(),
                    content: &entry.text,
                })
                .collect(),
            temperature: None,
            stream: false,
        };
        client
            .chat_completion(&request, |_| CHAT_GENERIC_FAILURE.to_string())
            .await
    }
}
