pub(crate) use crate::error::StudioError;
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::Json;
pub(crate) use axum::extract::{Multipart, Path, State};
pub(crate) use axum::http::header::CONTENT_TYPE;
pub(crate) use axum::response::IntoResponse;
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use tracing::{debug, info, instrument};
