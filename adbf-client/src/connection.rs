//! Client-server connection management
//!
//! Provides the WebSocket connection to the adbf backend. Frames are plain
//! JSON text; decoding happens in the session controller.

mod client;
mod handler;

pub use client::Connection;
pub use handler::MessageSender;
