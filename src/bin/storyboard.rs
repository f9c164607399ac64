use anyhow::{Context, Result};
use clap::Parser;
use comiccraft::config::setup_logging;
use comiccraft::images::{ImageSize, generate_image};
use comiccraft::panels::generate_panels;
use comiccraft::settings::{Settings, SettingsStore};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Break a story into comic panels from the command line.
///
/// Minimal UX:
///   storyboard story.txt --images
#[derive(Parser, Debug)]
#[command(name = "storyboard")]
#[command(about = "Turn a story into comic panels (and optionally images) and print them as JSON")]
struct Args {
    /// Story file, or `-` to read from stdin
    story: PathBuf,

    /// Settings file to start from; flags below override it
    #[arg(long, env = "COMICCRAFT_SETTINGS_PATH")]
    settings_path: Option<PathBuf>,

    /// API key
    #[arg(long, env = "COMICCRAFT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "COMICCRAFT_BASE_URL")]
    base_url: Option<String>,

    /// Text model endpoint ID
    #[arg(long, env = "COMICCRAFT_TEXT_MODEL")]
    text_model: Option<String>,

    /// Image model endpoint ID
    #[arg(long, env = "COMICCRAFT_IMAGE_MODEL")]
    image_model: Option<String>,

    /// Language for the captions
    #[arg(long)]
    caption_language: Option<String>,

    /// Also generate an image for every panel
    #[arg(long)]
    images: bool,

    /// Image size: 1K, 2K or 4K
    #[arg(long, default_value = "1K")]
    size: String,

    /// Write the JSON here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, env = "COMICCRAFT_DEBUG")]
    debug: bool,
}

fn read_story(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut story = String::new();
        io::stdin()
            .read_to_string(&mut story)
            .context("Failed to read story from stdin")?;
        Ok(story)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn apply_overrides(mut settings: Settings, args: &Args) -> Settings {
    let overrides = [
        (&mut settings.api_key, &args.api_key),
        (&mut settings.base_url, &args.base_url),
        (&mut settings.text_model, &args.text_model),
        (&mut settings.image_model, &args.image_model),
        (&mut settings.caption_language, &args.caption_language),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            *field = value.trim().to_string();
        }
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow::anyhow!(err))?;

    let size: ImageSize = serde_json::from_value(Value::String(args.size.clone()))
        .with_context(|| format!("Unknown image size {}", args.size))?;

    let settings = match &args.settings_path {
        Some(path) => SettingsStore::new(path.clone()).load().await?,
        None => Settings::default(),
    };
    let settings = apply_overrides(settings, &args);

    let story = read_story(&args.story)?;
    if story.trim().is_empty() {
        anyhow::bail!("The story is empty");
    }

    let http = reqwest::Client::new();
    let mut panels = generate_panels(&http, &story, &settings).await?;
    info!("Generated {} panels", panels.len());

    if args.images {
        for panel in panels.iter_mut() {
            match generate_image(&http, &panel.visual_prompt, size, &settings).await {
                Ok(url) => panel.image_url = Some(url),
                Err(err) => {
                    warn!("Image for {} failed: {}", panel.id, err);
                    break;
                }
            }
        }
    }

    let rendered = serde_json::to_string_pretty(&panels)?;
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => writeln!(io::stdout(), "{rendered}")?,
    }
    Ok(())
}
