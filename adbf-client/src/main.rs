//! adbf-webui - headless client for the adbf web UI
//!
//! Connects to the backend over WebSocket, prints every state change as a
//! log line and reads user actions from stdin. With `--replay` it feeds a
//! recorded event log through the same session engine instead.

use std::path::Path;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::codec::FramedRead;

use adbf_client::commands::{parse_action, UserAction};
use adbf_client::config::{load_config, ClientConfig};
use adbf_client::connection::Connection;
use adbf_client::render::{roster_lines, summary_lines, LogSink};
use adbf_client::{CommandSink, DeltaSink, SessionController};
use adbf_protocol::{ClientCodec, ClientCommand};
use adbf_utils::{init_logging_with_config, AdbfError, LogConfig, Result};

mod cli;

use cli::Args;

/// Sleep target while no debounce deadline is pending
const IDLE_WAIT: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let log_config = if args.log_file {
        LogConfig::client_with_file()
    } else {
        LogConfig::client()
    };
    init_logging_with_config(log_config)?;
    tracing::info!("adbf-webui starting");
    tracing::debug!("CLI args: {:?}", args);

    match run_app(args).await {
        Ok(()) => {
            tracing::info!("adbf-webui exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("adbf-webui error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = args.apply(load_config(args.config.as_deref()));

    match &args.replay {
        Some(path) => run_replay(path, &config).await,
        None => run_live(&config).await,
    }
}

async fn run_live(config: &ClientConfig) -> Result<()> {
    let mut connection = Connection::new(&config.server_url)?;
    let mut session =
        SessionController::new(config.session_params(), connection.sender(), LogSink::new());

    session.on_connecting();
    if let Err(e) = connection.connect().await {
        session.on_disconnected();
        return Err(e);
    }
    session.on_connected();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let deadline = session.next_deadline();
        let wake = deadline
            .map(tokio::time::Instant::from_std)
            .unwrap_or_else(|| tokio::time::Instant::now() + IDLE_WAIT);

        tokio::select! {
            frame = connection.recv() => match frame {
                Some(text) => {
                    session.on_frame(&text, Instant::now());
                }
                None => {
                    session.on_disconnected();
                    break;
                }
            },

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if handle_line(&mut session, &line) {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },

            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                session.on_tick(Instant::now());
            }

            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    // Indicators are reset before the socket goes away
    session.shutdown();
    connection.disconnect().await;

    for line in summary_lines(session.workflow(), session.progress(), session.roster()) {
        println!("{}", line);
    }
    Ok(())
}

/// Handle one stdin line, returning true when the session should end
fn handle_line<C, D>(session: &mut SessionController<C, D>, line: &str) -> bool
where
    C: CommandSink,
    D: DeltaSink,
{
    if line.trim().is_empty() {
        return false;
    }

    match parse_action(line) {
        Ok(UserAction::Quit) => return true,
        Ok(UserAction::Peers) => {
            for line in roster_lines(session.roster()) {
                println!("{}", line);
            }
        }
        Ok(UserAction::Unknown(name)) => tracing::warn!("unknown command '/{}'", name),
        Ok(action) => {
            if let Err(e) = session.perform(&action) {
                tracing::warn!("{}", e);
            }
        }
        Err(e) => tracing::warn!("{}", e),
    }
    false
}

async fn run_replay(path: &Path, config: &ClientConfig) -> Result<()> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AdbfError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    let mut frames = FramedRead::new(file, ClientCodec::new());

    let mut session =
        SessionController::new(config.session_params(), Vec::<ClientCommand>::new(), LogSink::new());
    session.on_connecting();
    session.on_connected();

    let mut line_no = 0usize;
    while let Some(item) = frames.next().await {
        line_no += 1;
        match item {
            Ok(Ok(event)) => {
                session.on_event(event, Instant::now());
            }
            Ok(Err(e)) => tracing::warn!(line = line_no, "skipping frame: {}", e),
            Err(e) => {
                tracing::error!(line = line_no, "replay stopped: {}", e);
                break;
            }
        }
    }

    // Let every pending debounce fire
    while let Some(deadline) = session.next_deadline() {
        session.on_tick(deadline);
    }
    session.shutdown();

    for command in session.command_sink() {
        tracing::info!("outbound: {}", command);
    }
    for line in summary_lines(session.workflow(), session.progress(), session.roster()) {
        println!("{}", line);
    }
    Ok(())
}
