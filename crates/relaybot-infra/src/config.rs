//! Relay configuration loading and data-directory resolution.
//!
//! Reads `{data_dir}/config.toml` into `RelayConfig`. A missing or
//! unparseable file falls back to defaults.

use std::path::{Path, PathBuf};

use relaybot_types::config::RelayConfig;

/// Load the relay config from `{data_dir}/config.toml`.
///
/// Returns `RelayConfig::default()` if the file is absent or invalid.
pub async fn load_relay_config(data_dir: &Path) -> RelayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RelayConfig::default()
        }
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `RELAYBOT_DATA_DIR` environment variable
/// 2. `~/.relaybot`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RELAYBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".relaybot");
    }

    PathBuf::from(".relaybot")
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// taken relative to the data directory.
pub fn resolve_in_data_dir(data_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
