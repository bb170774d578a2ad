//! Scan progress indicators
//!
//! One spinner per scan path plus a flag for the network wide search.
//! Switching an indicator on is immediate; switching it off goes through a
//! [`Debouncer`] so that an off/on pair inside the interval never flickers.

use std::time::{Duration, Instant};

use adbf_protocol::{ActivityTarget, PathEntry};
use adbf_utils::{AdbfError, Result};

use crate::debounce::Debouncer;
use crate::delta::StateDelta;
use crate::workflow::HOME_HINT;

/// Default delay before an indicator visibly switches off
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// A directory the backend is scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPath {
    pub number: usize,
    pub display_name: String,
    pub spinning: bool,
    /// `refresh` pulses seen for this path
    pub steps: u64,
}

impl ScanPath {
    fn new(entry: &PathEntry) -> Self {
        Self {
            number: entry.nr,
            display_name: normalize_display_name(&entry.name),
            spinning: false,
            steps: 0,
        }
    }
}

/// Display form of a scan path name
///
/// The backend scans the home directory for an empty entry.
pub fn normalize_display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return HOME_HINT.to_string();
    }
    let without_slash = trimmed.trim_end_matches('/');
    if without_slash.is_empty() {
        "/".to_string()
    } else {
        without_slash.to_string()
    }
}

/// Per path spinners and the network activity flag
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    paths: Vec<ScanPath>,
    network_active: bool,
    net_steps: u64,
    registered: bool,
    timers: Debouncer<ActivityTarget>,
}

impl ProgressTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            paths: Vec::new(),
            network_active: false,
            net_steps: 0,
            registered: false,
            timers: Debouncer::new(debounce),
        }
    }

    pub fn paths(&self) -> &[ScanPath] {
        &self.paths
    }

    pub fn path(&self, number: usize) -> Option<&ScanPath> {
        self.paths.iter().find(|p| p.number == number)
    }

    pub fn network_active(&self) -> bool {
        self.network_active
    }

    pub fn net_steps(&self) -> u64 {
        self.net_steps
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Whether a deactivation is waiting for `target`
    pub fn is_pending_off(&self, target: ActivityTarget) -> bool {
        self.timers.is_pending(&target)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Create the scan paths announced by the server
    ///
    /// Only the first announcement of an epoch is used.
    pub fn register_scan_paths(&mut self, entries: &[PathEntry]) -> Option<StateDelta> {
        if self.registered {
            tracing::warn!(
                count = entries.len(),
                "scan paths already registered, ignoring announcement"
            );
            return None;
        }

        self.paths = entries.iter().map(ScanPath::new).collect();
        self.registered = true;
        Some(StateDelta::ScanPathsRegistered {
            paths: self.paths.clone(),
        })
    }

    pub fn set_network_activity(&mut self, active: bool, now: Instant) -> Option<StateDelta> {
        self.set_target(ActivityTarget::Net, active, now)
    }

    pub fn set_spinning(
        &mut self,
        number: usize,
        active: bool,
        now: Instant,
    ) -> Result<Option<StateDelta>> {
        if self.path(number).is_none() {
            return Err(AdbfError::UnknownPath(number));
        }
        Ok(self.set_target(ActivityTarget::Path { nr: number }, active, now))
    }

    /// Apply a `searching` update to whichever indicator it names
    pub fn set_activity(
        &mut self,
        target: ActivityTarget,
        active: bool,
        now: Instant,
    ) -> Result<Option<StateDelta>> {
        match target {
            ActivityTarget::Net => Ok(self.set_network_activity(active, now)),
            ActivityTarget::Path { nr } => self.set_spinning(nr, active, now),
        }
    }

    fn set_target(&mut self, target: ActivityTarget, active: bool, now: Instant) -> Option<StateDelta> {
        if active {
            if self.timers.cancel(&target) {
                tracing::trace!(%target, "pending deactivation cancelled");
            }
            if self.flag(target) {
                return None;
            }
            self.set_flag(target, true);
            return Some(Self::changed(target, true));
        }

        if self.flag(target) {
            let deadline = self.timers.schedule(target, now);
            tracing::trace!(%target, ?deadline, "deactivation scheduled");
        }
        None
    }

    /// Count a one shot progress step
    pub fn pulse(&mut self, target: ActivityTarget) -> Result<StateDelta> {
        match target {
            ActivityTarget::Net => self.net_steps += 1,
            ActivityTarget::Path { nr } => {
                let path = self
                    .paths
                    .iter_mut()
                    .find(|p| p.number == nr)
                    .ok_or(AdbfError::UnknownPath(nr))?;
                path.steps += 1;
            }
        }
        Ok(StateDelta::ActivityPulse { target })
    }

    /// Apply every deactivation that is due at `now`
    pub fn on_tick(&mut self, now: Instant) -> Vec<StateDelta> {
        self.timers
            .expire(now)
            .into_iter()
            .filter_map(|target| {
                if !self.flag(target) {
                    return None;
                }
                self.set_flag(target, false);
                Some(Self::changed(target, false))
            })
            .collect()
    }

    /// Switch everything off at once, bypassing the debounce
    pub fn reset_all(&mut self) -> Vec<StateDelta> {
        self.timers.clear();

        let mut deltas = Vec::new();
        for path in self.paths.iter_mut().filter(|p| p.spinning) {
            path.spinning = false;
            deltas.push(StateDelta::SpinnerChanged {
                nr: path.number,
                spinning: false,
            });
        }
        if self.network_active {
            self.network_active = false;
            deltas.push(StateDelta::NetworkActivityChanged { active: false });
        }
        deltas
    }

    /// Drop the registered paths so the next epoch can announce its own
    pub fn clear(&mut self) {
        self.timers.clear();
        self.paths.clear();
        self.network_active = false;
        self.net_steps = 0;
        self.registered = false;
    }

    fn flag(&self, target: ActivityTarget) -> bool {
        match target {
            ActivityTarget::Net => self.network_active,
            ActivityTarget::Path { nr } => self.path(nr).is_some_and(|p| p.spinning),
        }
    }

    fn set_flag(&mut self, target: ActivityTarget, value: bool) {
        match target {
            ActivityTarget::Net => self.network_active = value,
            ActivityTarget::Path { nr } => {
                if let Some(path) = self.paths.iter_mut().find(|p| p.number == nr) {
                    path.spinning = value;
                }
            }
        }
    }

    fn changed(target: ActivityTarget, value: bool) -> StateDelta {
        match target {
            ActivityTarget::Net => StateDelta::NetworkActivityChanged { active: value },
            ActivityTarget::Path { nr } => StateDelta::SpinnerChanged {
                nr,
                spinning: value,
            },
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
