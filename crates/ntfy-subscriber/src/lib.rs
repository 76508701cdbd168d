//! # ntfy-subscriber
//!
//! A resilient subscriber for [ntfy](https://ntfy.sh) topics over WebSocket.
//!
//! One connection carries a pair of topics, a *commands* topic and a
//! *responses* topic. Every inbound frame is classified; frames with content
//! are handed to an [`EventSink`] tagged with the topic they belong to.
//! Dropped connections are re-established with tiered backoff, and a
//! liveness monitor recycles connections that have silently gone dead.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ntfy_subscriber::{ChannelSink, Listener, ListenerConfig};
//!
//! #[tokio::main]
//! async fn main() -> ntfy_subscriber::NtfyResult<()> {
//!     // Load config from ntfy.toml or environment
//!     let config = ListenerConfig::discover(None)?;
//!
//!     let (sink, mut rx) = ChannelSink::new(64);
//!     let mut handle = Listener::new(config, Arc::new(sink)).try_start()?;
//!
//!     while let Some((kind, event)) = rx.events.recv().await {
//!         println!("[{}] {}: {}", kind, event.topic, event.message);
//!     }
//!
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`ListenerConfig`] for the full configuration reference.
//! The simplest setup uses environment variables:
//!
//! ```bash
//! export NTFY_URL="https://ntfy.sh"
//! export NTFY_COMMANDS_TOPIC="boat-commands"
//! export NTFY_RESPONSES_TOPIC="boat-responses"
//! ```
//!
//! Or an `ntfy.toml` file with several servers:
//!
//! ```toml
//! active_server_id = "home"
//! commands_topic = "boat-commands"
//! responses_topic = "boat-responses"
//!
//! [[servers]]
//! id = "home"
//! url = "http://192.168.1.5"
//!
//! [[servers]]
//! id = "public"
//! url = "https://ntfy.sh"
//! token = "tk_..."
//! ```

pub mod backoff;
pub mod classifier;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod liveness;
pub mod protocol;
pub mod sink;

// ─── Public re-exports ──────────────────────────────────────────────────

pub use backoff::BackoffSchedule;
pub use classifier::{Classification, Classifier};
pub use config::ListenerConfig;
pub use endpoint::ServerEndpoint;
pub use error::{NtfyError, NtfyResult};
pub use listener::{ConnectionEvent, ConnectionState, Listener, ListenerHandle};
pub use protocol::{ClassifiedEvent, EventKind, InboundFrame, TopicSet};
pub use sink::{ChannelSink, EventSink};
