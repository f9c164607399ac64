use clap::Parser;
use comiccraft::config::setup_logging;
use comiccraft::settings::SettingsStore;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = comiccraft::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let store = SettingsStore::new(cli.settings_path());

    if let Err(err) = comiccraft::web::setup_server(&cli.listen_address, cli.port, store).await {
        error!("Application error: {}", err);
    }
}
