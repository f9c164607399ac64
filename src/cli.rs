//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::SETTINGS_PATH;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "COMICCRAFT_DEBUG")]
    /// Enable debug logging. Env: COMICCRAFT_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "COMICCRAFT_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: COMICCRAFT_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "COMICCRAFT_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: COMICCRAFT_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, short, env = "COMICCRAFT_SETTINGS_PATH")]
    /// Path to the settings file, defaults to `./comiccraft_settings.json`.
    /// Env: COMICCRAFT_SETTINGS_PATH
    pub settings_path: Option<PathBuf>,
}

impl CliOptions {
    /// The settings file to use.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(|| SETTINGS_PATH.clone())
    }
}
