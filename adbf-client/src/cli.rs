//! Command-line argument parsing for adbf-webui
//!
//! Uses clap for argument parsing with derive macros.

use clap::Parser;
use std::path::PathBuf;

use adbf_client::config::ClientConfig;

/// adbf-webui - headless client for the adbf web UI session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// WebSocket endpoint of the adbf backend
    ///
    /// Example: ws://127.0.0.1:8080/ws
    #[arg(long, env = "ADBF_URL")]
    pub url: Option<String>,

    /// Config file (defaults to ~/.config/adbf/client.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Peer id of this node
    ///
    /// Summaries reported for this id go to the local result view.
    #[arg(long)]
    pub peer_id: Option<String>,

    /// Maximum number of path slots
    #[arg(long)]
    pub max_paths: Option<usize>,

    /// Delay in milliseconds before an activity indicator switches off
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Replay a recorded event log (.jsonl) instead of connecting
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Also write logs to the log file under the state directory
    #[arg(long, default_value_t = false)]
    pub log_file: bool,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply command-line overrides on top of the loaded config
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.url {
            config.server_url = url.clone();
        }
        if let Some(peer_id) = &self.peer_id {
            config.local_peer_id = Some(peer_id.clone());
        }
        if let Some(max_paths) = self.max_paths {
            if max_paths == 0 {
                tracing::warn!("ignoring --max-paths 0");
            } else {
                config.max_paths = max_paths;
            }
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.debounce_ms = debounce_ms;
        }
        config
    }
}
