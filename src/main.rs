use std::process::ExitCode;

use tracing::{error, info};

use folio::{Config, Database};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = folio::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        folio::logging::init_console_only(&config.logging.level);
    }

    info!("folio - private client galleries");

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            return ExitCode::FAILURE;
        }
    };

    match db.schema_version().await {
        Ok(version) => info!(
            "Database ready at {} (schema v{})",
            config.database.path, version
        ),
        Err(e) => {
            error!("Failed to read schema version: {e}");
            return ExitCode::FAILURE;
        }
    }

    info!(
        "Serving photos from {} (scan ceiling {}, default limit {})",
        config.storage.delivery_domain, config.sampler.max_scan, config.sampler.default_limit
    );
    ExitCode::SUCCESS
}
