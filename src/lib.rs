//! ComicCraft: turns a short story into comic panels, illustrates them, and
//! hosts a writing-assistant chat, all against an OpenAI-compatible API.

#![allow(clippy::multiple_crate_versions)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::disallowed_methods)]
#![deny(clippy::expect_used)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::panic)]
#![deny(clippy::perf)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::unreachable)]
#![deny(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod images;
pub mod panels;
pub mod settings;
pub mod video;
pub mod web;
