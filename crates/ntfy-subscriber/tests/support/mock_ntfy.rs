#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub const STEP_TIMEOUT: Duration = Duration::from_secs(3);

enum ConnectionCommand {
    SendText(String),
    ForceClose,
}

/// What the subscriber sent us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Ping,
    Close,
}

pub struct MockConnection {
    index: usize,
    uri: String,
    frame_rx: mpsc::Receiver<ClientFrame>,
    command_tx: mpsc::Sender<ConnectionCommand>,
}

impl MockConnection {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Request path and query of the WebSocket upgrade.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub async fn recv_frame(&mut self) -> ClientFrame {
        timeout(STEP_TIMEOUT, self.frame_rx.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("mock connection frame channel closed")
    }

    pub async fn send_text(&self, text: &str) {
        self.command_tx
            .send(ConnectionCommand::SendText(text.to_string()))
            .await
            .expect("failed to send command to mock connection");
    }

    pub async fn send_json(&self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Drop the TCP connection without a closing handshake.
    pub async fn force_close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::ForceClose).await;
    }
}

pub struct MockNtfyServer {
    addr: SocketAddr,
    connection_rx: mpsc::Receiver<MockConnection>,
    server_task: JoinHandle<()>,
}

impl MockNtfyServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let (connection_tx, connection_rx) = mpsc::channel(16);
        let next_connection_index = Arc::new(AtomicUsize::new(0));

        let server_task = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };

                let connection_tx = connection_tx.clone();
                let connection_index = next_connection_index.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    let mut uri = String::new();
                    let record_uri = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                        uri = request.uri().to_string();
                        Ok(response)
                    };
                    let ws_stream = match accept_hdr_async(stream, record_uri).await {
                        Ok(ws) => ws,
                        Err(_) => return,
                    };

                    let (mut ws_sink, mut ws_source) = ws_stream.split();
                    let (frame_tx, frame_rx) = mpsc::channel(64);
                    let (command_tx, mut command_rx) = mpsc::channel(64);

                    let connection = MockConnection {
                        index: connection_index,
                        uri,
                        frame_rx,
                        command_tx,
                    };

                    if connection_tx.send(connection).await.is_err() {
                        return;
                    }

                    loop {
                        tokio::select! {
                            maybe_command = command_rx.recv() => {
                                match maybe_command {
                                    Some(ConnectionCommand::SendText(text)) => {
                                        if ws_sink.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Some(ConnectionCommand::ForceClose) | None => break,
                                }
                            }
                            maybe_message = ws_source.next() => {
                                match maybe_message {
                                    Some(Ok(Message::Text(text))) => {
                                        let _ = frame_tx.send(ClientFrame::Text(text.to_string())).await;
                                    }
                                    Some(Ok(Message::Ping(_))) => {
                                        let _ = frame_tx.send(ClientFrame::Ping).await;
                                    }
                                    Some(Ok(Message::Close(_))) => {
                                        let _ = frame_tx.send(ClientFrame::Close).await;
                                        break;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(_)) | None => break,
                                }
                            }
                        }
                    }
                });
            }
        });

        Ok(Self {
            addr,
            connection_rx,
            server_task,
        })
    }

    /// HTTP base URL, as a user would configure it.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn accept_connection(&mut self) -> MockConnection {
        timeout(STEP_TIMEOUT, self.connection_rx.recv())
            .await
            .expect("timed out waiting for client connection")
            .expect("mock server connection channel closed")
    }

    pub async fn try_accept_connection(&mut self, wait: Duration) -> Option<MockConnection> {
        match timeout(wait, self.connection_rx.recv()).await {
            Ok(Some(connection)) => Some(connection),
            _ => None,
        }
    }
}

impl Drop for MockNtfyServer {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

/// An address nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
