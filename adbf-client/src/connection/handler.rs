//! Outbound command sender

use adbf_protocol::ClientCommand;
use adbf_utils::{AdbfError, Result};
use tokio::sync::mpsc;

use crate::session::CommandSink;

/// Clonable command sender
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::Sender<ClientCommand>,
}

impl MessageSender {
    pub fn new(tx: mpsc::Sender<ClientCommand>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, command: ClientCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| AdbfError::ConnectionClosed)?;
        Ok(())
    }

    /// Send without waiting (fire and forget)
    pub fn send_nowait(&self, command: ClientCommand) {
        if let Err(e) = self.tx.try_send(command) {
            tracing::debug!("dropping outbound command: {}", e);
        }
    }
}

impl CommandSink for MessageSender {
    fn dispatch(&mut self, command: ClientCommand) {
        self.send_nowait(command);
    }
}
