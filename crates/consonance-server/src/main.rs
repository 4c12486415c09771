//! Consonance server binary.
//!
//! Startup sequence:
//! 1. Load configuration (`CONSONANCE_CONFIG` or `consonance-config.yaml`)
//! 2. Initialize structured logging
//! 3. Build stream backends, analyzers and the emergence detector
//! 4. Serve HTTP and `WebSocket` traffic until terminated

use std::path::PathBuf;
use std::sync::Arc;

use consonance_core::config::ConsonanceConfig;
use consonance_server::error::StartupError;
use consonance_server::{AppState, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config file read when `CONSONANCE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "consonance-config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_path) = load_config()?;

    init_logging(&config);
    info!(
        config = %config_path.display(),
        host = %config.server.host,
        port = config.server.port,
        "consonance-server starting"
    );

    let state = AppState::from_config(&config).map_err(StartupError::from)?;
    info!(
        analytical = %config.streams.analytical.model,
        intuitive = %config.streams.intuitive.model,
        context_turns = config.streams.context_turns,
        "pipeline ready"
    );

    start_server(&config.server, Arc::new(state))
        .await
        .map_err(StartupError::from)?;

    info!("consonance-server stopped");
    Ok(())
}

/// Read the config file, or fall back to defaults plus environment
/// overrides when it does not exist.
fn load_config() -> Result<(ConsonanceConfig, PathBuf), StartupError> {
    let path = std::env::var_os("CONSONANCE_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if path.exists() {
        ConsonanceConfig::from_file(&path)?
    } else {
        ConsonanceConfig::from_env()?
    };
    Ok((config, path))
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &ConsonanceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
