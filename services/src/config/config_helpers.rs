// services/src/config/config_helpers.rs
use std::path::Path;

use log::{info, warn};
use serde_yaml2 as serde_yaml;

use models::errors::{ApiError, ApiResult};

use crate::config::config_structs::ServerConfig;

/// Load the server configuration from a YAML file. A missing file is not
/// an error; the defaults cover local development. Keys absent from the
/// file fall back to their defaults via `#[serde(default)]`.
pub fn load_config(path: Option<&Path>) -> ApiResult<ServerConfig> {
    let Some(path) = path else {
        info!("No config file given, using default configuration");
        return Ok(ServerConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using default configuration",
            path.display()
        );
        return Ok(ServerConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ApiError::storage(format!("Failed to read config {}: {}", path.display(), e))
    })?;

    let config: ServerConfig = serde_yaml::from_str(&content).map_err(|e| {
        ApiError::validation(format!("Failed to parse config {}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
