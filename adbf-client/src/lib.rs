//! adbf-client: session state engine for the adbf web UI
//!
//! Consumes the ordered event stream pushed by the adbf backend and keeps
//! three independent pieces of client state consistent:
//!
//! - [`workflow`]: the directory selection slots configured before a scan
//! - [`roster`]: discovered peers and their scan summaries
//! - [`progress`]: per path spinners and the network search flag
//!
//! [`session::SessionController`] owns the connection lifecycle, routes
//! decoded events to those trackers and turns user actions into outbound
//! commands. Every state change is published as a [`delta::StateDelta`].

pub mod commands;
pub mod config;
pub mod connection;
pub mod debounce;
pub mod delta;
pub mod progress;
pub mod render;
pub mod roster;
pub mod session;
pub mod workflow;

pub use commands::{parse_action, ParseError, UserAction};
pub use delta::{CallbackSink, DeltaSink, StateDelta};
pub use session::{CommandSink, ConnectionState, SessionController, SessionParams};
