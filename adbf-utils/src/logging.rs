//! Logging infrastructure for adbf
//!
//! Provides unified logging setup using the tracing ecosystem.

use std::sync::Mutex;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, AdbfError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "ADBF_LOG";

/// Log file name used when [`LogConfig::file_name`] is unset
pub const DEFAULT_LOG_FILE: &str = "adbf-webui.log";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr
    Stderr,
    /// Log to file under the state directory
    File,
    /// Log to both stderr and file
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "adbf_client=debug")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Config for the headless web UI client
    ///
    /// Deltas are printed as log lines, so stderr is the default sink.
    pub fn client() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }

    /// Same as [`LogConfig::client`] but also appending to the log file
    pub fn client_with_file() -> Self {
        Self {
            output: LogOutput::Both,
            ..Self::client()
        }
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| AdbfError::config(format!("Invalid log filter: {}", e)))?;

    let span_events = if config.span_events {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };
    let (to_stderr, to_file) = match config.output {
        LogOutput::Stderr => (true, false),
        LogOutput::File => (false, true),
        LogOutput::Both => (true, true),
    };

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(span_events.clone())
            .with_file(config.file_line)
            .with_line_number(config.file_line)
    });

    let file_layer = if to_file {
        let file = open_log_file(config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE))?;
        Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_span_events(span_events)
                .with_file(config.file_line)
                .with_line_number(config.file_line),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AdbfError::internal(format!("Failed to init logging: {}", e)))
}

fn open_log_file(file_name: &str) -> Result<std::fs::File> {
    let log_dir = paths::log_dir();
    paths::ensure_dir(&log_dir).map_err(|e| AdbfError::FileWrite {
        path: log_dir.clone(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| AdbfError::FileWrite {
            path: log_path,
            source: e,
        })
}
