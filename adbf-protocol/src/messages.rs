//! Client-server message types
//!
//! Every frame on the wire is a JSON object of the form
//! `{"event": <tag>, "data": <payload>}`. Payload-less frames omit `data`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ==================== Outbound ====================

/// Location to enumerate for a path slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirRequest {
    /// Slot index
    pub nr: usize,
    /// Directory to list, empty for the server's default (home)
    pub dir: String,
}

/// Commands sent from the client to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Sent right after the connection opens
    Ready,

    /// Ask for the sub directories of a location
    RestDir(DirRequest),

    /// Confirm the selected directories and start scanning
    Start(Vec<String>),
}

impl ClientCommand {
    /// Wire tag of this command
    pub fn tag(&self) -> &'static str {
        match self {
            ClientCommand::Ready => "ready",
            ClientCommand::RestDir(_) => "rest_dir",
            ClientCommand::Start(_) => "start",
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::encode_command(self))
    }
}

// ==================== Inbound ====================

/// Result of a directory listing for one slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirListing {
    pub nr: usize,
    pub dirs: Vec<String>,
}

/// One finalized scan path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathEntry {
    /// Server assigned number, not necessarily dense
    pub nr: usize,
    pub name: String,
}

/// Finalized set of paths being scanned
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanPathList {
    pub paths: Vec<PathEntry>,
}

/// What a `searching` or `refresh` event refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "type", content = "cnt", rename_all = "snake_case")]
pub enum ActivityTarget {
    /// A single scan path
    Path { nr: usize },
    /// The network wide peer search
    Net,
}

impl fmt::Display for ActivityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityTarget::Path { nr } => write!(f, "path {}", nr),
            ActivityTarget::Net => write!(f, "net"),
        }
    }
}

/// `[target, active]` pair carried by `searching`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityUpdate(pub ActivityTarget, pub bool);

impl ActivityUpdate {
    pub fn target(&self) -> ActivityTarget {
        self.0
    }

    pub fn active(&self) -> bool {
        self.1
    }
}

/// A peer as announced by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerAnnouncement {
    pub id: String,
    pub addr: Vec<String>,
}

/// Counters a peer reports once its collection is done
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanSummary {
    #[serde(rename = "nr_searched_files", default)]
    pub searched_files: u32,
    #[serde(rename = "nr_found_songs", default)]
    pub found_audio_files: u32,
    #[serde(rename = "nr_internal_duplicates", default)]
    pub duplicates: u32,
    #[serde(rename = "size_of_data_in_kb", default)]
    pub data_size_kb: u64,
}

/// `finished` payload of an `update` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerResult {
    pub peer: String,
    pub data: ScanSummary,
}

/// Roster mutation carried by `update`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "view", content = "cnt", rename_all = "snake_case")]
pub enum NetUpdate {
    Add(PeerAnnouncement),
    Remove(String),
    Finished(PeerResult),
}

/// Events pushed from the server to the client
///
/// The set is closed except for [`ServerEvent::Unknown`], which keeps any
/// tag this client does not understand together with its raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Remembered directories from the last run
    InitPaths(Vec<String>),

    /// Directory listing answering a `rest_dir` command
    RestDirs(DirListing),

    /// Paths the backend is now scanning (legacy tag `init`)
    Start(ScanPathList),

    /// Activity switched on or off
    Searching(ActivityUpdate),

    /// One-shot progress step for a path or the net search
    Refresh(ActivityTarget),

    /// Peer roster change
    Update(NetUpdate),

    /// Explicit no-op
    Nothing,

    /// Tag outside the known set
    Unknown {
        tag: String,
        payload: serde_json::Value,
    },
}

impl ServerEvent {
    /// Wire tag of this event
    pub fn tag(&self) -> &str {
        match self {
            ServerEvent::InitPaths(_) => "init_paths",
            ServerEvent::RestDirs(_) => "rest_dirs",
            ServerEvent::Start(_) => "start",
            ServerEvent::Searching(_) => "searching",
            ServerEvent::Refresh(_) => "refresh",
            ServerEvent::Update(_) => "update",
            ServerEvent::Nothing => "nothing",
            ServerEvent::Unknown { tag, .. } => tag,
        }
    }
}
