//! Path utilities for adbf
//!
//! Handles XDG Base Directory specification compliance for config
//! and state directories.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application identifier for XDG directories
const APP_NAME: &str = "adbf";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/adbf` or `~/.config/adbf`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the web UI client configuration file path
///
/// Location: `$XDG_CONFIG_HOME/adbf/client.toml`
pub fn client_config_file() -> PathBuf {
    config_dir().join("client.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/adbf` or `~/.local/state/adbf`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/adbf/log` or `~/.local/state/adbf/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        tracing::debug!(path = %path.display(), "created directory");
    }
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_contains_adbf() {
        let path = config_dir();
        assert!(path.to_string_lossy().contains("adbf"));
    }

    #[test]
    fn test_client_config_file_name() {
        let path = client_config_file();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "client.toml");
        assert!(path.starts_with(config_dir()));
    }

    #[test]
    fn test_state_dir_contains_adbf() {
        let path = state_dir();
        assert!(path.to_string_lossy().contains("adbf"));
    }

    #[test]
    fn test_log_dir_is_under_state() {
        let log = log_dir();
        assert!(log.starts_with(state_dir()));
        assert_eq!(log.file_name().unwrap().to_str().unwrap(), "log");
    }

    #[test]
    fn test_fallbacks_use_app_name() {
        assert!(fallback_config_dir().ends_with(".config/adbf"));
        assert!(fallback_state_dir().ends_with(".local/state/adbf"));
    }

    #[test]
    fn test_ensure_dir_nested() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Second call is a no-op
        ensure_dir(&nested).unwrap();
    }
}
