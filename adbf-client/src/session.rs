//! Session controller
//!
//! Owns the connection lifecycle and routes every decoded event to exactly
//! one tracker. Events, user actions and timer ticks are handled one at a
//! time on the caller's task; nothing in here blocks or locks.

use std::time::{Duration, Instant};

use adbf_protocol::{decode_event, ClientCommand, NetUpdate, ServerEvent};
use adbf_utils::{AdbfError, Result};

use crate::commands::UserAction;
use crate::delta::{DeltaSink, StateDelta};
use crate::progress::{ProgressTracker, DEFAULT_DEBOUNCE};
use crate::roster::Roster;
use crate::workflow::PathWorkflow;

/// Slot limit used when the server does not announce one
pub const DEFAULT_MAX_PATHS: usize = 10;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Values the server hands to the page it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Peer id of this node, used to spot the local result
    pub local_peer_id: Option<String>,
    pub max_paths: usize,
    pub debounce: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            local_peer_id: None,
            max_paths: DEFAULT_MAX_PATHS,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Receiver of outbound commands (the transport side)
pub trait CommandSink {
    fn dispatch(&mut self, command: ClientCommand);
}

impl CommandSink for Vec<ClientCommand> {
    fn dispatch(&mut self, command: ClientCommand) {
        self.push(command);
    }
}

/// Reconciles server events and user intent into client state
pub struct SessionController<C, D> {
    state: ConnectionState,
    workflow: PathWorkflow,
    roster: Roster,
    progress: ProgressTracker,
    commands: C,
    deltas: D,
}

impl<C, D> SessionController<C, D>
where
    C: CommandSink,
    D: DeltaSink,
{
    pub fn new(params: SessionParams, commands: C, deltas: D) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            workflow: PathWorkflow::new(params.max_paths),
            roster: Roster::new(params.local_peer_id),
            progress: ProgressTracker::new(params.debounce),
            commands,
            deltas,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn workflow(&self) -> &PathWorkflow {
        &self.workflow
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn command_sink(&self) -> &C {
        &self.commands
    }

    pub fn delta_sink(&self) -> &D {
        &self.deltas
    }

    pub fn delta_sink_mut(&mut self) -> &mut D {
        &mut self.deltas
    }

    // === Connection lifecycle ===

    /// A new connection attempt starts a new epoch
    ///
    /// Registered scan paths and the roster belong to the previous epoch and
    /// are dropped. Workflow slots are kept.
    pub fn on_connecting(&mut self) -> Vec<StateDelta> {
        let deltas = self.on_disconnected();
        tracing::debug!("connecting, starting new session epoch");
        self.progress.clear();
        self.roster.clear();
        self.state = ConnectionState::Connecting;
        deltas
    }

    /// Connection is open: announce it and send the handshake
    pub fn on_connected(&mut self) -> Vec<StateDelta> {
        match self.state {
            ConnectionState::Connected => {
                tracing::debug!("already connected");
                return Vec::new();
            }
            ConnectionState::Disconnected => {
                self.progress.clear();
                self.roster.clear();
            }
            ConnectionState::Connecting => {}
        }

        self.state = ConnectionState::Connected;
        tracing::info!("session connected");
        self.send(ClientCommand::Ready);
        self.publish(vec![StateDelta::Connected])
    }

    /// Transport is gone: switch every indicator off and report it once
    pub fn on_disconnected(&mut self) -> Vec<StateDelta> {
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        self.state = ConnectionState::Disconnected;
        let mut deltas = self.progress.reset_all();
        deltas.push(StateDelta::Disconnected);
        tracing::info!("session disconnected");
        self.publish(deltas)
    }

    /// Close the session before the transport is released
    pub fn shutdown(&mut self) -> Vec<StateDelta> {
        tracing::debug!(state = ?self.state, "shutting down session");
        self.on_disconnected()
    }

    // === Inbound events ===

    /// Decode one text frame and handle it
    ///
    /// A frame that does not decode is dropped; the session continues.
    pub fn on_frame(&mut self, text: &str, now: Instant) -> Vec<StateDelta> {
        match decode_event(text) {
            Ok(event) => self.on_event(event, now),
            Err(e) => {
                tracing::warn!("dropping undecodable frame: {}", e);
                Vec::new()
            }
        }
    }

    pub fn on_event(&mut self, event: ServerEvent, now: Instant) -> Vec<StateDelta> {
        tracing::trace!(tag = event.tag(), "event received");
        if self.state != ConnectionState::Connected {
            tracing::debug!(tag = event.tag(), state = ?self.state, "event outside connected state");
        }

        let deltas = match event {
            ServerEvent::InitPaths(paths) => self.workflow.seed(&paths),
            ServerEvent::RestDirs(listing) => condition(
                self.workflow
                    .apply_listing(listing.nr, &listing.dirs)
                    .map(Some),
                "rest_dirs",
            ),
            ServerEvent::Start(list) => self
                .progress
                .register_scan_paths(&list.paths)
                .into_iter()
                .collect(),
            ServerEvent::Searching(update) => condition(
                self.progress
                    .set_activity(update.target(), update.active(), now),
                "searching",
            ),
            ServerEvent::Refresh(target) => {
                condition(self.progress.pulse(target).map(Some), "refresh")
            }
            ServerEvent::Update(update) => self.on_net_update(update),
            ServerEvent::Nothing => Vec::new(),
            ServerEvent::Unknown { tag, payload } => {
                tracing::warn!(tag = %tag, "unhandled event");
                vec![StateDelta::Unhandled { tag, payload }]
            }
        };
        self.publish(deltas)
    }

    fn on_net_update(&mut self, update: NetUpdate) -> Vec<StateDelta> {
        match update {
            NetUpdate::Add(peer) => vec![self.roster.add_peer(&peer.id, peer.addr)],
            NetUpdate::Remove(id) => {
                let delta = self.roster.remove_peer(&id);
                if delta.is_none() {
                    tracing::debug!(peer = %id, "remove for unknown peer");
                }
                delta.into_iter().collect()
            }
            NetUpdate::Finished(result) => condition(
                self.roster
                    .apply_result_summary(&result.peer, result.data)
                    .map(Some),
                "finished",
            ),
        }
    }

    // === Timers ===

    /// Earliest pending debounce deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.progress.next_deadline()
    }

    /// Apply every debounced deactivation due at `now`
    pub fn on_tick(&mut self, now: Instant) -> Vec<StateDelta> {
        let deltas = self.progress.on_tick(now);
        self.publish(deltas)
    }

    // === User actions ===

    pub fn add_slot(&mut self, remembered: Option<String>) -> Result<StateDelta> {
        let delta = self.workflow.add_slot(remembered)?;
        Ok(self.publish_one(delta))
    }

    pub fn remove_last_slot(&mut self) -> Result<StateDelta> {
        let delta = self.workflow.remove_last_slot()?;
        Ok(self.publish_one(delta))
    }

    pub fn request_listing(&mut self, index: usize) -> Result<StateDelta> {
        let (command, delta) = self.workflow.request_listing(index)?;
        self.send(command);
        Ok(self.publish_one(delta))
    }

    pub fn choose_directory(&mut self, index: usize, dir: impl Into<String>) -> Result<StateDelta> {
        let delta = self.workflow.choose_directory(index, dir)?;
        Ok(self.publish_one(delta))
    }

    pub fn confirm_selections(&mut self) -> Result<StateDelta> {
        let (command, delta) = self.workflow.confirm_selections()?;
        self.send(command);
        Ok(self.publish_one(delta))
    }

    /// Run a parsed user action
    ///
    /// Actions that only concern the front end (`Peers`, `Quit`) produce
    /// nothing here.
    pub fn perform(&mut self, action: &UserAction) -> Result<Vec<StateDelta>> {
        let delta = match action {
            UserAction::AddSlot(dir) => self.add_slot(dir.clone())?,
            UserAction::RemoveSlot => self.remove_last_slot()?,
            UserAction::List(index) => self.request_listing(*index)?,
            UserAction::Choose(index, dir) => self.choose_directory(*index, dir.clone())?,
            UserAction::Start => self.confirm_selections()?,
            UserAction::Peers | UserAction::Quit => return Ok(Vec::new()),
            UserAction::Unknown(name) => return Err(AdbfError::UnknownAction(name.clone())),
        };
        Ok(vec![delta])
    }

    fn send(&mut self, command: ClientCommand) {
        if self.state != ConnectionState::Connected {
            tracing::debug!(command = command.tag(), "sending while not connected");
        }
        tracing::debug!(command = command.tag(), "sending command");
        self.commands.dispatch(command);
    }

    fn publish(&mut self, deltas: Vec<StateDelta>) -> Vec<StateDelta> {
        for delta in &deltas {
            self.deltas.apply(delta.clone());
        }
        deltas
    }

    fn publish_one(&mut self, delta: StateDelta) -> StateDelta {
        self.deltas.apply(delta.clone());
        delta
    }
}

/// Log a local condition raised while handling an event and carry on
fn condition<T>(result: Result<T>, tag: &str) -> Vec<StateDelta>
where
    T: IntoIterator<Item = StateDelta>,
{
    match result {
        Ok(deltas) => deltas.into_iter().collect(),
        Err(e) if e.is_local_condition() => {
            tracing::debug!(tag, "ignored: {}", e);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(tag, "event failed: {}", e);
            Vec::new()
        }
    }
}
