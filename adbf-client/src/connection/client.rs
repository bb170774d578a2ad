//! WebSocket connection to the adbf backend

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use adbf_protocol::{encode_command, ClientCommand};
use adbf_utils::{AdbfError, Result};

use super::handler::MessageSender;
use crate::session::ConnectionState;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client connection to the adbf backend
pub struct Connection {
    /// WebSocket endpoint (ws:// or wss://)
    url: Url,
    /// Current state
    state: ConnectionState,
    /// Channel for outgoing commands
    tx: mpsc::Sender<ClientCommand>,
    /// Receiving end of `tx`, handed to the connection task on connect
    outgoing_rx: Option<mpsc::Receiver<ClientCommand>>,
    /// Channel for receiving text frames, set by `connect`
    rx: Option<mpsc::Receiver<String>>,
    /// Handle to the connection task
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    /// Create a new connection (not yet connected)
    pub fn new(addr: &str) -> Result<Self> {
        let url = Url::parse(addr)
            .map_err(|e| AdbfError::connection(format!("Invalid URL '{}': {}", addr, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(AdbfError::connection(format!(
                "Unsupported scheme '{}', expected ws or wss",
                url.scheme()
            )));
        }

        let (tx, outgoing_rx) = mpsc::channel(100);

        Ok(Self {
            url,
            state: ConnectionState::Disconnected,
            tx,
            outgoing_rx: Some(outgoing_rx),
            rx: None,
            task_handle: None,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connect to the server
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        let url = self.url.to_string();
        let (socket, _response) = connect_async(url.as_str()).await.map_err(|e| {
            self.state = ConnectionState::Disconnected;
            AdbfError::connection(format!("Failed to connect to {}: {}", url, e))
        })?;

        let outgoing_rx = match self.outgoing_rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(100);
                self.tx = tx;
                rx
            }
        };
        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(100);
        self.rx = Some(incoming_rx);

        let handle = tokio::spawn(Self::connection_task(socket, outgoing_rx, incoming_tx));
        self.task_handle = Some(handle);

        self.state = ConnectionState::Connected;
        tracing::info!(url = %self.url, "Connected to server");
        Ok(())
    }

    /// Disconnect from server
    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        self.rx = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Send a command to the server
    pub async fn send(&self, command: ClientCommand) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(AdbfError::connection("Not connected"));
        }

        self.tx
            .send(command)
            .await
            .map_err(|_| AdbfError::ConnectionClosed)?;

        Ok(())
    }

    /// Receive the next text frame
    ///
    /// Returns `None` once the socket is gone, or immediately when
    /// `connect` has not succeeded yet.
    pub async fn recv(&mut self) -> Option<String> {
        let frame = match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => return None,
        };
        if frame.is_none() {
            self.rx = None;
            self.state = ConnectionState::Disconnected;
        }
        frame
    }

    /// Get a command sender that can be cloned
    ///
    /// Valid before `connect`; commands queue until the socket is up.
    pub fn sender(&self) -> MessageSender {
        MessageSender::new(self.tx.clone())
    }

    /// Background task that handles the actual socket I/O
    async fn connection_task(
        mut socket: Socket,
        mut outgoing: mpsc::Receiver<ClientCommand>,
        incoming: mpsc::Sender<String>,
    ) {
        loop {
            tokio::select! {
                Some(command) = outgoing.recv() => {
                    let text = encode_command(&command);
                    tracing::trace!(frame = %text, "sending frame");
                    if let Err(e) = socket.send(Message::Text(text)).await {
                        tracing::error!("Failed to send command: {}", e);
                        break;
                    }
                }

                result = socket.next() => {
                    match result {
                        Some(Ok(Message::Text(text))) => {
                            if incoming.send(text).await.is_err() {
                                tracing::debug!("Incoming channel closed, receiver dropped");
                                break;
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                            Ok(text) => {
                                if incoming.send(text).await.is_err() {
                                    tracing::debug!("Incoming channel closed, receiver dropped");
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("Dropping non UTF-8 binary frame: {}", e),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Server closed connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("Failed to receive frame: {}", e);
                            break;
                        }
                        None => {
                            tracing::info!("Server closed connection");
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_connection_state_initial() {
        let conn = Connection::new("ws://127.0.0.1:8080/ws").unwrap();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.url().path(), "/ws");
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            Connection::new("not a url"),
            Err(AdbfError::Connection(_))
        ));
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(
            Connection::new("http://127.0.0.1:8080/ws"),
            Err(AdbfError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_send_not_connected() {
        let conn = Connection::new("ws://127.0.0.1:8080/ws").unwrap();
        let result = conn.send(ClientCommand::Ready).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recv_before_connect() {
        let mut conn = Connection::new("ws://127.0.0.1:8080/ws").unwrap();
        assert_eq!(conn.recv().await, None);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_no_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut conn = Connection::new(&format!("ws://{}/ws", addr)).unwrap();
        assert!(conn.connect().await.is_err());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_exchange_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text(r#"{"event":"nothing"}"#.to_string()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            first
        });

        let mut conn = Connection::new(&format!("ws://{}/ws", addr)).unwrap();
        // Queued before connect, flushed once the socket is up
        conn.sender().send_nowait(ClientCommand::Ready);
        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);

        assert_eq!(conn.recv().await.as_deref(), Some(r#"{"event":"nothing"}"#));
        assert_eq!(conn.recv().await, None);
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let first = server.await.unwrap();
        assert_eq!(first, Message::Text(r#"{"event":"ready"}"#.to_string()));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        });

        let mut conn = Connection::new(&format!("ws://{}/ws", addr)).unwrap();
        conn.connect().await.unwrap();
        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.recv().await, None);

        server.await.unwrap();
    }
}
