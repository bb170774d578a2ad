//! Peer roster
//!
//! Tracks the peers taking part in the distributed search. The local peer is
//! never listed; its summary goes to a separate local result view.

use adbf_protocol::ScanSummary;
use adbf_utils::{AdbfError, Result};

use crate::delta::StateDelta;

/// A remote participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub addresses: Vec<String>,
    pub result_summary: Option<ScanSummary>,
}

impl Peer {
    pub fn new(id: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            id: id.into(),
            addresses,
            result_summary: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.result_summary.is_some()
    }
}

/// Sums over every remote peer that reported a summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterTotals {
    pub finished_peers: usize,
    pub searched_files: u64,
    pub found_audio_files: u64,
    pub duplicates: u64,
    pub data_size_kb: u64,
}

/// Discovered peers in announcement order
#[derive(Debug, Clone, Default)]
pub struct Roster {
    local_id: Option<String>,
    peers: Vec<Peer>,
    local_result: Option<ScanSummary>,
}

impl Roster {
    pub fn new(local_id: Option<String>) -> Self {
        Self {
            local_id,
            peers: Vec::new(),
            local_result: None,
        }
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn get(&self, id: &str) -> Option<&Peer> {
        self.peers.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Last summary reported for the local peer
    pub fn local_result(&self) -> Option<&ScanSummary> {
        self.local_result.as_ref()
    }

    fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    /// Insert a peer, or replace the addresses of an existing one
    pub fn add_peer(&mut self, id: &str, addresses: Vec<String>) -> StateDelta {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.id == id) {
            tracing::debug!(peer = id, "duplicate announcement, replacing addresses");
            peer.addresses = addresses;
            return StateDelta::PeerUpdated { peer: peer.clone() };
        }

        let peer = Peer::new(id, addresses);
        self.peers.push(peer.clone());
        StateDelta::PeerAdded { peer }
    }

    /// Remove a peer; absent ids are ignored
    pub fn remove_peer(&mut self, id: &str) -> Option<StateDelta> {
        let pos = self.peers.iter().position(|p| p.id == id)?;
        self.peers.remove(pos);
        Some(StateDelta::PeerRemoved { id: id.to_string() })
    }

    /// Attach a scan summary to a peer or to the local result view
    pub fn apply_result_summary(&mut self, id: &str, summary: ScanSummary) -> Result<StateDelta> {
        if self.is_local(id) {
            self.local_result = Some(summary);
            return Ok(StateDelta::LocalResultUpdated { summary });
        }

        let peer = self
            .peers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AdbfError::UnknownPeer(id.to_string()))?;
        peer.result_summary = Some(summary);
        Ok(StateDelta::PeerUpdated { peer: peer.clone() })
    }

    pub fn totals(&self) -> RosterTotals {
        self.peers
            .iter()
            .filter_map(|p| p.result_summary.as_ref())
            .fold(RosterTotals::default(), |mut acc, s| {
                acc.finished_peers += 1;
                acc.searched_files += u64::from(s.searched_files);
                acc.found_audio_files += u64::from(s.found_audio_files);
                acc.duplicates += u64::from(s.duplicates);
                acc.data_size_kb += s.data_size_kb;
                acc
            })
    }

    /// Forget every peer and the local result
    pub fn clear(&mut self) {
        self.peers.clear();
        self.local_result = None;
    }
}
