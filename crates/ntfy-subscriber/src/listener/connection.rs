use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::backoff::BackoffSchedule;
use crate::classifier::{Classification, Classifier};
use crate::config::LivenessConfig;
use crate::endpoint::redact_auth;
use crate::error::{NtfyError, NtfyResult};
use crate::liveness::{LivenessMonitor, LivenessSignal};
use crate::protocol::InboundFrame;
use crate::sink::EventSink;

use super::{ConnectionEvent, ConnectionState};

/// Upper bound on the WebSocket handshake, TLS included.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// How an open session ended.
enum SessionEnd {
    Stopped,
    Lost(NtfyError),
}

/// One turn of the session loop.
enum Step {
    Stop,
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Liveness(LivenessSignal),
}

/// The listener task: connect, drive, back off, repeat.
pub(super) struct Connection {
    pub(super) url: String,
    pub(super) server_id: String,
    pub(super) classifier: Classifier,
    pub(super) backoff: BackoffSchedule,
    pub(super) attempt_cap: Option<u32>,
    pub(super) liveness: LivenessConfig,
    pub(super) sink: Arc<dyn EventSink>,
    pub(super) state_tx: Arc<watch::Sender<ConnectionState>>,
    pub(super) event_tx: broadcast::Sender<ConnectionEvent>,
    pub(super) stop_rx: watch::Receiver<bool>,
}

impl Connection {
    pub(super) async fn run(mut self) {
        // Consecutive failed or dropped connections since the last open.
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            self.emit(ConnectionEvent::Connecting { attempt });

            let connected = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop_rx) => None,
                result = connect(&self.url) => Some(result),
            };
            let Some(result) = connected else {
                break;
            };

            let failure = match result {
                Ok(ws) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Open);
                    self.emit(ConnectionEvent::Connected {
                        server_id: self.server_id.clone(),
                    });
                    match self.drive(ws).await {
                        SessionEnd::Stopped => break,
                        SessionEnd::Lost(e) => e,
                    }
                }
                Err(e) => e,
            };

            tracing::warn!(
                server = %self.server_id,
                attempt,
                error = %failure,
                "ntfy connection lost"
            );
            self.emit(ConnectionEvent::Disconnected {
                reason: failure.to_string(),
            });

            let failures = attempt.saturating_add(1);
            if self.attempt_cap.is_some_and(|cap| failures >= cap) {
                self.give_up(failures, &failure);
                return;
            }

            let delay = self.backoff.delay(attempt);
            attempt = failures;
            self.set_state(ConnectionState::Reconnecting { attempt });
            self.emit(ConnectionEvent::Reconnecting { attempt, delay });
            tracing::info!(attempt, ?delay, "Reconnecting to ntfy");

            let stopped = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop_rx) => true,
                () = tokio::time::sleep(delay) => false,
            };
            if stopped {
                break;
            }
        }

        self.set_state(ConnectionState::Closing);
        self.set_state(ConnectionState::Stopped);
        self.emit(ConnectionEvent::Stopped);
        tracing::info!(server = %self.server_id, "ntfy listener stopped");
    }

    /// Pump one open connection until it ends or a stop is requested.
    async fn drive(&mut self, ws: WsStream) -> SessionEnd {
        let (mut writer, mut reader) = ws.split();
        let mut monitor = LivenessMonitor::new(&self.liveness);

        loop {
            let step = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop_rx) => Step::Stop,
                frame = reader.next() => Step::Frame(frame),
                signal = monitor.next_signal() => Step::Liveness(signal),
            };

            match step {
                Step::Stop => {
                    self.set_state(ConnectionState::Closing);
                    close_quietly(&mut writer).await;
                    return SessionEnd::Stopped;
                }
                Step::Frame(Some(Ok(message))) => {
                    monitor.touch();
                    match message {
                        Message::Text(text) => {
                            let text: &str = &text;
                            self.dispatch(&InboundFrame::new(text));
                        }
                        Message::Close(frame) => {
                            let reason = frame.map_or_else(
                                || "closed by server".to_string(),
                                |f| format!("closed by server ({}): {}", u16::from(f.code), &*f.reason),
                            );
                            return SessionEnd::Lost(NtfyError::ConnectionLost { reason });
                        }
                        Message::Binary(data) => {
                            tracing::debug!(bytes = data.len(), "Ignoring binary frame");
                        }
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                            tracing::trace!("Control frame");
                        }
                    }
                }
                Step::Frame(Some(Err(e))) => return SessionEnd::Lost(e.into()),
                Step::Frame(None) => {
                    return SessionEnd::Lost(NtfyError::ConnectionLost {
                        reason: "stream ended".into(),
                    });
                }
                Step::Liveness(LivenessSignal::Stale { idle }) => {
                    tracing::warn!(
                        idle_secs = idle.as_secs(),
                        "No traffic from ntfy, recycling connection"
                    );
                    self.emit(ConnectionEvent::LivenessTimeout { idle });
                    close_quietly(&mut writer).await;
                    return SessionEnd::Lost(NtfyError::ConnectionLost {
                        reason: format!("no traffic for {}s", idle.as_secs()),
                    });
                }
                Step::Liveness(LivenessSignal::Ping) => {
                    tracing::trace!("Sending keepalive ping");
                    if let Err(e) = writer.send(Message::Ping(Default::default())).await {
                        return SessionEnd::Lost(e.into());
                    }
                }
                Step::Liveness(LivenessSignal::Healthy) => {}
            }
        }
    }

    fn dispatch(&self, frame: &InboundFrame) {
        tracing::debug!(raw = %frame.text, "ntfy frame");
        match self.classifier.classify(frame) {
            Classification::Content(event) => {
                tracing::debug!(
                    kind = %event.kind,
                    id = %event.id,
                    topic = %event.topic,
                    "Forwarding ntfy event"
                );
                if let Err(e) = self.sink.publish(event.kind, &event) {
                    tracing::warn!(id = %event.id, error = %e, "Sink rejected ntfy event");
                }
            }
            Classification::Control { event } => {
                tracing::debug!(event = %event, "ntfy control event");
            }
            other => {
                tracing::debug!(classification = other.label(), "Dropping frame without content");
            }
        }
    }

    fn give_up(&self, attempts: u32, last_error: &NtfyError) {
        tracing::error!(
            server = %self.server_id,
            attempts,
            error = %last_error,
            "ntfy reconnection attempts exhausted"
        );
        self.emit(ConnectionEvent::ReconnectFailed {
            attempts,
            last_error: last_error.to_string(),
        });
        self.sink.report_error(NtfyError::ReconnectionExhausted {
            attempts,
            last_error: last_error.to_string(),
        });
        self.set_state(ConnectionState::Idle);
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "Listener state");
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.event_tx.send(event);
    }
}

async fn connect(url: &str) -> NtfyResult<WsStream> {
    tracing::debug!(url = %redact_auth(url), "Connecting to ntfy");
    let (ws, response) = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(url))
        .await
        .map_err(|_| NtfyError::Timeout {
            seconds: CONNECT_TIMEOUT.as_secs(),
        })?
        .map_err(|e| NtfyError::ConnectionFailed {
            url: redact_auth(url),
            reason: e.to_string(),
        })?;

    tracing::info!(url = %redact_auth(url), status = %response.status(), "Connected to ntfy");
    Ok(ws)
}

/// Send a close frame. A dead peer must not hold up the caller.
async fn close_quietly(writer: &mut WsWriter) {
    match tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Error closing ntfy socket"),
        Err(_) => tracing::debug!("Timed out closing ntfy socket"),
    }
}

/// Resolves once a stop is requested or the handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow_and_update() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}
