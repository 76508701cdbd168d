//! # Connection Manager
//!
//! Owns the single WebSocket subscription to the active ntfy server and
//! keeps it alive:
//!
//! - **Reconnection** on close, error or connect failure, with tiered backoff
//! - **Liveness** checks that force a reconnect when the socket goes quiet
//! - **Classification** of every text frame, with content handed to an
//!   [`EventSink`]
//! - **Connection events** on a broadcast channel for lifecycle observers
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ntfy_subscriber::{ChannelSink, Listener, ListenerConfig, ServerEndpoint};
//!
//! # async fn demo() {
//! let config = ListenerConfig::new(vec![ServerEndpoint::new("home", "https://ntfy.sh")])
//!     .with_topics(Some("boat-commands"), Some("boat-responses"));
//! let (sink, mut rx) = ChannelSink::new(64);
//!
//! let listener = Listener::new(config, Arc::new(sink));
//! let mut events = listener.event_receiver();
//! let mut handle = listener.start();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Connection event: {event:?}");
//!     }
//! });
//!
//! while let Some((kind, event)) = rx.events.recv().await {
//!     println!("{}: {}", kind.path(), event.message);
//! }
//! handle.stop().await;
//! # }
//! ```
//!
//! ## State Machine
//!
//! ```text
//! Idle ──start──► Connecting ──open──► Open
//!                   ▲   │                │ close / error / stale
//!                   │   └── failure ──┐  │
//!                   │                 ▼  ▼
//!                   └──── delay ── Reconnecting ── cap reached ──► Idle
//!
//! any ──stop──► Closing ──► Stopped
//! ```
//!
//! The listener lives as long as its [`ListenerHandle`]. Dropping the
//! handle stops it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::classifier::Classifier;
use crate::config::ListenerConfig;
use crate::endpoint::redact_auth;
use crate::error::{NtfyError, NtfyResult};
use crate::sink::EventSink;

mod connection;

use connection::Connection;

/// How long [`ListenerHandle::stop`] waits for the task before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle state of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to be. Initial state, and the state
    /// after reconnection attempts are exhausted.
    Idle,

    /// A connection attempt is in flight.
    Connecting,

    /// Subscribed and receiving frames.
    Open,

    /// Shutting down after a stop request.
    Closing,

    /// Waiting out the backoff delay before connection attempt `attempt`.
    Reconnecting { attempt: u32 },

    /// Stopped by its owner. Terminal.
    Stopped,
}

/// Connection lifecycle events emitted by a running listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// About to connect. `attempt` counts consecutive failures so far.
    Connecting { attempt: u32 },

    /// The WebSocket handshake completed.
    Connected { server_id: String },

    /// The connection closed, failed or could not be established.
    Disconnected { reason: String },

    /// Nothing arrived for `idle`; the connection is being recycled.
    LivenessTimeout { idle: Duration },

    /// Waiting `delay` before the next attempt.
    Reconnecting { attempt: u32, delay: Duration },

    /// The configured attempt cap was reached. The listener is idle.
    ReconnectFailed { attempts: u32, last_error: String },

    /// Stopped on request.
    Stopped,
}

/// An unstarted listener: configuration, sink and event channel.
pub struct Listener {
    config: ListenerConfig,
    sink: Arc<dyn EventSink>,
    event_tx: broadcast::Sender<ConnectionEvent>,
}

impl Listener {
    pub fn new(config: ListenerConfig, sink: Arc<dyn EventSink>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            sink,
            event_tx,
        }
    }

    /// Subscribe to connection events. Subscribe before starting to see the
    /// first connection attempt.
    pub fn event_receiver(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Start listening, reporting configuration problems to the sink.
    ///
    /// A configuration error (no active server, no topics, an unusable URL,
    /// backoff table or liveness timing) is passed to
    /// [`EventSink::report_error`] and the returned handle stays
    /// [`ConnectionState::Idle`]. Must be called from within a Tokio runtime.
    pub fn start(self) -> ListenerHandle {
        let sink = Arc::clone(&self.sink);
        let event_tx = self.event_tx.clone();
        match self.try_start() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "ntfy listener not started");
                sink.report_error(e);
                ListenerHandle::idle(event_tx)
            }
        }
    }

    /// Start listening.
    ///
    /// # Errors
    /// Returns the configuration error instead of reporting it.
    pub fn try_start(self) -> NtfyResult<ListenerHandle> {
        let endpoint = self.config.active_endpoint()?;
        let topics = self.config.topics();
        if topics.is_empty() {
            return Err(NtfyError::NoTopics);
        }
        let url = endpoint.ws_url(&topics)?;
        let backoff = self.config.reconnect.schedule()?;
        self.config.liveness.validate()?;

        tracing::info!(
            server = %endpoint.id,
            url = %redact_auth(&url),
            topics = %topics.joined(),
            "Starting ntfy listener"
        );

        install_crypto_provider();

        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let state_tx = Arc::new(state_tx);
        let connection = Connection {
            url,
            server_id: endpoint.id.clone(),
            classifier: Classifier::new(topics),
            backoff,
            attempt_cap: self.config.reconnect.attempt_cap(),
            liveness: self.config.liveness.clone(),
            sink: self.sink,
            state_tx: Arc::clone(&state_tx),
            event_tx: self.event_tx.clone(),
            stop_rx,
        };
        let task = tokio::spawn(connection.run());

        Ok(ListenerHandle {
            stop_tx,
            task: Some(task),
            state_tx,
            state_rx,
            event_tx: self.event_tx,
        })
    }
}

/// Control handle for a started listener.
pub struct ListenerHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    event_tx: broadcast::Sender<ConnectionEvent>,
}

impl ListenerHandle {
    /// A handle with no task behind it.
    fn idle(event_tx: broadcast::Sender<ConnectionEvent>) -> Self {
        let (stop_tx, _) = watch::channel(true);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        Self {
            stop_tx,
            task: None,
            state_tx: Arc::new(state_tx),
            state_rx,
            event_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn event_receiver(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the listener task is still alive (connecting, open or
    /// backing off).
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait until the listener task ends on its own, which only happens
    /// when reconnection attempts are exhausted. Cancel-safe.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "ntfy listener task failed");
            }
            self.task = None;
        }
    }

    /// Stop the listener and wait for it to shut down.
    ///
    /// Closes the socket and cancels any pending reconnect. Once this
    /// returns no further events reach the sink and the state is
    /// [`ConnectionState::Stopped`], even if the task had to be aborted.
    /// Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        let Some(task) = self.task.take() else {
            return;
        };
        join_or_abort(task, STOP_TIMEOUT, &self.state_tx).await;
    }
}

/// Wait up to `limit` for the listener task, then abort it. An aborted task
/// never reaches its own shutdown, so the terminal state is set here.
async fn join_or_abort(
    task: JoinHandle<()>,
    limit: Duration,
    state_tx: &watch::Sender<ConnectionState>,
) {
    let abort = task.abort_handle();
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(())) => {
            tracing::debug!("ntfy listener stopped");
            return;
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "ntfy listener task failed"),
        Err(_) => {
            tracing::warn!("ntfy listener did not stop in time, aborting");
            abort.abort();
        }
    }
    state_tx.send_replace(ConnectionState::Stopped);
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(feature = "rustls-tls")]
fn install_crypto_provider() {
    // Err means a provider is already installed.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

#[cfg(not(feature = "rustls-tls"))]
fn install_crypto_provider() {}
