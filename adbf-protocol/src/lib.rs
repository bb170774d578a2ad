//! adbf-protocol: message definitions for the adbf web UI connection
//!
//! The backend pushes tagged JSON events over a single WebSocket and the
//! browser client answers with a handful of tagged commands. This crate
//! defines both directions plus the codecs that turn them into text frames.

pub mod codec;
pub mod messages;

pub use codec::{decode_event, encode_command, ClientCodec, CodecError, MAX_FRAME_SIZE};
pub use messages::{
    ActivityTarget, ActivityUpdate, ClientCommand, DirListing, DirRequest, NetUpdate,
    PathEntry, PeerAnnouncement, PeerResult, ScanPathList, ScanSummary, ServerEvent,
};
