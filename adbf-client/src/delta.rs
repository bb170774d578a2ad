//! State deltas handed to the rendering layer
//!
//! The engine never builds markup. Each state change is described by a
//! [`StateDelta`] and pushed to a [`DeltaSink`]; the renderer decides how
//! to show it.

use adbf_protocol::{ActivityTarget, ScanSummary};

use crate::progress::ScanPath;
use crate::roster::Peer;
use crate::workflow::{ListingEntry, PathSlot};

/// A single observable state change
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    /// Connection is open and the handshake was sent
    Connected,
    /// Connection is gone; all activity indicators were reset
    Disconnected,

    // === Path selection ===
    SlotAdded { slot: PathSlot },
    SlotRemoved { index: usize },
    ListingRequested { index: usize },
    ListingApplied { index: usize, entries: Vec<ListingEntry> },
    DirectoryChosen { index: usize, dir: String },
    SelectionsConfirmed { dirs: Vec<String> },

    // === Progress ===
    ScanPathsRegistered { paths: Vec<ScanPath> },
    SpinnerChanged { nr: usize, spinning: bool },
    NetworkActivityChanged { active: bool },
    ActivityPulse { target: ActivityTarget },

    // === Roster ===
    PeerAdded { peer: Peer },
    PeerRemoved { id: String },
    PeerUpdated { peer: Peer },
    LocalResultUpdated { summary: ScanSummary },

    /// Event this client has no handler for, forwarded as received
    Unhandled {
        tag: String,
        payload: serde_json::Value,
    },
}

/// Receiver of state deltas (the rendering collaborator)
pub trait DeltaSink {
    fn apply(&mut self, delta: StateDelta);
}

impl DeltaSink for Vec<StateDelta> {
    fn apply(&mut self, delta: StateDelta) {
        self.push(delta);
    }
}

/// Simple callback-based sink
pub struct CallbackSink<F>
where
    F: FnMut(StateDelta),
{
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(StateDelta),
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> DeltaSink for CallbackSink<F>
where
    F: FnMut(StateDelta),
{
    fn apply(&mut self, delta: StateDelta) {
        (self.callback)(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<StateDelta> = Vec::new();
        sink.apply(StateDelta::Connected);
        sink.apply(StateDelta::SlotRemoved { index: 0 });
        assert_eq!(
            sink,
            vec![StateDelta::Connected, StateDelta::SlotRemoved { index: 0 }]
        );
    }

    #[test]
    fn test_callback_sink_receives_deltas() {
        let mut count = 0;
        {
            let mut sink = CallbackSink::new(|_delta| count += 1);
            sink.apply(StateDelta::Connected);
            sink.apply(StateDelta::Disconnected);
        }
        assert_eq!(count, 2);
    }
}
