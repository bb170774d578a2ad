//! adbf-utils: Common utilities shared across adbf crates
//!
//! This crate provides:
//! - Unified error types ([`AdbfError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{AdbfError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};

pub use paths::{client_config_file, config_dir, log_dir, state_dir};
