//! Client-side configuration loading
//!
//! Reads `client.toml` from the adbf config directory. Every field has a
//! default, so a missing or partial file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use adbf_utils::{client_config_file, AdbfError};

use crate::session::{SessionParams, DEFAULT_MAX_PATHS};

/// Default server endpoint
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080/ws";

/// Default debounce in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Web UI client configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the adbf backend
    pub server_url: String,
    /// Delay before an activity indicator switches off
    pub debounce_ms: u64,
    /// Maximum number of path slots
    pub max_paths: usize,
    /// Peer id of this node, normally templated in by the server
    pub local_peer_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_paths: DEFAULT_MAX_PATHS,
            local_peer_id: None,
        }
    }
}

impl ClientConfig {
    /// Parse a config file body
    pub fn parse(content: &str, path: &Path) -> adbf_utils::Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| AdbfError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.max_paths == 0 {
            return Err(AdbfError::ConfigInvalid {
                path: path.to_path_buf(),
                message: "max_paths must be at least 1".into(),
            });
        }
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            local_peer_id: self.local_peer_id.clone(),
            max_paths: self.max_paths,
            debounce: self.debounce(),
        }
    }
}

/// Load the client config
///
/// Uses `path` when given, otherwise the default location. Returns defaults
/// if the file doesn't exist or can't be read or parsed.
pub fn load_config(path: Option<&Path>) -> ClientConfig {
    let path: PathBuf = path.map(Path::to_path_buf).unwrap_or_else(client_config_file);

    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return ClientConfig::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match ClientConfig::parse(&content, &path) {
            Ok(config) => {
                tracing::debug!(
                    "Loaded config: server_url={}, debounce_ms={}, max_paths={}",
                    config.server_url,
                    config.debounce_ms,
                    config.max_paths
                );
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                ClientConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file: {}, using defaults", e);
            ClientConfig::default()
        }
    }
}
