//! Logging setup

use tracing::log::LevelFilter;

/// Crates that drown out the studio's own logs unless we're debugging.
const CHATTY_MODULES: &[&str] = &["rustls", "hyper_util", "reqwest", "h2", "tracing"];

/// Level for the studio's own modules.
pub fn log_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger. `tracing` events reach it through the `log` bridge.
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let mut logger = simple_logger::SimpleLogger::new().with_level(log_level(debug));
    if !debug {
        for module in CHATTY_MODULES {
            let level = if *module == "tracing" {
                LevelFilter::Warn
            } else {
                LevelFilter::Info
            };
            logger = logger.with_module_level(*module, level);
        }
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}
