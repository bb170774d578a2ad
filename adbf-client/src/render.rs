//! Text rendering of state deltas
//!
//! The headless client has no markup; deltas become log lines and the
//! final state becomes a short summary.

use adbf_protocol::ScanSummary;

use crate::delta::{DeltaSink, StateDelta};
use crate::progress::ProgressTracker;
use crate::roster::Roster;
use crate::workflow::PathWorkflow;

/// One line description of a delta
pub fn describe_delta(delta: &StateDelta) -> String {
    match delta {
        StateDelta::Connected => "connected".to_string(),
        StateDelta::Disconnected => "disconnected".to_string(),
        StateDelta::SlotAdded { slot } => {
            format!("slot {} added [{}]", slot.index, slot.display_directory())
        }
        StateDelta::SlotRemoved { index } => format!("slot {} removed", index),
        StateDelta::ListingRequested { index } => format!("slot {} listing requested", index),
        StateDelta::ListingApplied { index, entries } => {
            let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            format!("slot {} listing: {}", index, names.join("  "))
        }
        StateDelta::DirectoryChosen { index, dir } => format!("slot {} -> {}", index, dir),
        StateDelta::SelectionsConfirmed { dirs } => {
            format!("scan requested for {} path(s)", dirs.len())
        }
        StateDelta::ScanPathsRegistered { paths } => {
            let names: Vec<String> = paths
                .iter()
                .map(|p| format!("#{} {}", p.number, p.display_name))
                .collect();
            format!("scanning {}", names.join(", "))
        }
        StateDelta::SpinnerChanged { nr, spinning } => {
            format!("path {} {}", nr, if *spinning { "busy" } else { "idle" })
        }
        StateDelta::NetworkActivityChanged { active } => {
            format!("network search {}", if *active { "busy" } else { "idle" })
        }
        StateDelta::ActivityPulse { target } => format!("{} step", target),
        StateDelta::PeerAdded { peer } => {
            format!("peer {} joined ({})", peer.id, peer.addresses.join(", "))
        }
        StateDelta::PeerRemoved { id } => format!("peer {} left", id),
        StateDelta::PeerUpdated { peer } => match &peer.result_summary {
            Some(summary) => format!("peer {} finished: {}", peer.id, describe_summary(summary)),
            None => format!("peer {} now at {}", peer.id, peer.addresses.join(", ")),
        },
        StateDelta::LocalResultUpdated { summary } => {
            format!("local scan finished: {}", describe_summary(summary))
        }
        StateDelta::Unhandled { tag, payload } => format!("unhandled '{}': {}", tag, payload),
    }
}

pub fn describe_summary(summary: &ScanSummary) -> String {
    format!(
        "{} files searched, {} audio files, {} duplicates, {} kB",
        summary.searched_files, summary.found_audio_files, summary.duplicates, summary.data_size_kb
    )
}

/// Roster listing for `/peers`
pub fn roster_lines(roster: &Roster) -> Vec<String> {
    let mut lines: Vec<String> = roster
        .peers()
        .iter()
        .map(|peer| {
            let status = match &peer.result_summary {
                Some(summary) => describe_summary(summary),
                None => "searching".to_string(),
            };
            format!("{} [{}] {}", peer.id, peer.addresses.join(", "), status)
        })
        .collect();

    if lines.is_empty() {
        lines.push("no peers".to_string());
    }

    let totals = roster.totals();
    if totals.finished_peers > 0 {
        lines.push(format!(
            "total over {} peer(s): {} files searched, {} audio files, {} duplicates, {} kB",
            totals.finished_peers,
            totals.searched_files,
            totals.found_audio_files,
            totals.duplicates,
            totals.data_size_kb
        ));
    }
    lines
}

/// Final session summary
pub fn summary_lines(
    workflow: &PathWorkflow,
    progress: &ProgressTracker,
    roster: &Roster,
) -> Vec<String> {
    let mut lines = Vec::new();

    for slot in workflow.slots() {
        lines.push(format!("slot {}: {}", slot.index, slot.display_directory()));
    }
    for path in progress.paths() {
        lines.push(format!(
            "path #{} {} ({} steps)",
            path.number, path.display_name, path.steps
        ));
    }
    if let Some(summary) = roster.local_result() {
        lines.push(format!("local: {}", describe_summary(summary)));
    }
    lines.extend(roster_lines(roster));
    lines
}

/// Sink that logs every delta
#[derive(Debug, Default)]
pub struct LogSink {
    applied: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deltas logged so far
    pub fn applied(&self) -> usize {
        self.applied
    }
}

impl DeltaSink for LogSink {
    fn apply(&mut self, delta: StateDelta) {
        self.applied += 1;
        match &delta {
            StateDelta::Unhandled { .. } => tracing::warn!("{}", describe_delta(&delta)),
            _ => tracing::info!("{}", describe_delta(&delta)),
        }
    }
}
