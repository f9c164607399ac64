//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info};

/// Message returned when the transport never produced an HTTP response.
pub const NETWORK_FAILURE_MESSAGE: &str = "Network request failed before the API answered. \
The request may have been blocked by a cross-origin policy, firewall or proxy; \
check the base URL or configure a proxy.";

/// Errors surfaced by the studio operations.
#[derive(Debug)]
pub enum StudioError {
    /// A credential, model id or base URL is missing; raised before any I/O.
    Configuration(String),
    /// The transport failed to complete the request.
    Network(String),
    /// The API answered with a non-success status.
    Api(String),
    /// The API reply could not be coerced into the expected shape.
    Parse(String),
    /// The operation is not available with the configured provider.
    Unsupported(String),
    /// The caller sent something we can't work with.
    BadRequest(String),
    /// A requested resource is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl StudioError {
    /// Stable tag for the error class, used by the browser front-end.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Network(_) => "network",
            Self::Api(_) => "api",
            Self::Parse(_) => "parse",
            Self::Unsupported(_) => "unsupported",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::InternalServerError(_) => "internal",
        }
    }

    /// Builds the network-layer error, keeping the transport detail for the logs.
    pub(crate) fn network(err: &reqwest::Error) -> Self {
        error!("Transport failure talking to the model API: {err}");
        Self::Network(NETWORK_FAILURE_MESSAGE.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Network(_) | Self::Api(_) | Self::Parse(_) => StatusCode::BAD_GATEWAY,
            Self::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for StudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg)
            | Self::Network(msg)
            | Self::Api(msg)
            | Self::Parse(msg)
            | Self::Unsupported(msg)
            | Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::InternalServerError(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for StudioError {}

impl From<std::io::Error> for StudioError {
    fn from(err: std::io::Error) -> Self {
        StudioError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(err: serde_json::Error) -> Self {
        StudioError::InternalServerError(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for StudioError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        StudioError::BadRequest(err.to_string())
    }
}

impl IntoResponse for StudioError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        match &self {
            StudioError::InternalServerError(message) => {
                error!("Internal server error: {}", message);
            }
            StudioError::Network(_) | StudioError::Api(_) | StudioError::Parse(_) => {
                error!("Upstream failure ({}): {}", self.kind(), self);
            }
            _ => info!("Request rejected ({}): {}", self.kind(), self),
        }
        let message = match &self {
            StudioError::InternalServerError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (
            status,
            Json(json!({ "kind": self.kind(), "message": message })),
        )
            .into_response()
    }
}
