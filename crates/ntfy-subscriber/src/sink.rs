//! # Event Sink
//!
//! Where classified events go. The listener calls the sink from inside its
//! event loop, so implementations must return quickly: hand the event off
//! to a channel or a spawned task rather than doing I/O inline.
//!
//! A sink error is logged by the listener and otherwise ignored; it never
//! affects the connection.

use tokio::sync::mpsc;

use crate::error::{NtfyError, NtfyResult};
use crate::protocol::{ClassifiedEvent, EventKind};

/// Downstream consumer of classified events.
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one content event.
    ///
    /// # Errors
    /// Implementations return an error when the event could not be
    /// accepted; the listener logs it and carries on.
    fn publish(&self, kind: EventKind, event: &ClassifiedEvent) -> NtfyResult<()>;

    /// Diagnostic channel for failures that stop a listener (configuration
    /// errors, reconnection exhausted). The default only logs.
    fn report_error(&self, error: NtfyError) {
        tracing::error!(error = %error, "ntfy listener error");
    }
}

/// Receiving halves of a [`ChannelSink`].
pub struct SinkReceivers {
    pub events: mpsc::Receiver<(EventKind, ClassifiedEvent)>,
    pub errors: mpsc::Receiver<NtfyError>,
}

/// Sink that forwards events and errors over bounded channels.
///
/// Uses `try_send`, so a slow consumer causes events to be rejected
/// instead of stalling the listener.
#[derive(Clone)]
pub struct ChannelSink {
    events: mpsc::Sender<(EventKind, ClassifiedEvent)>,
    errors: mpsc::Sender<NtfyError>,
}

impl ChannelSink {
    /// Create a sink buffering up to `capacity` events. A capacity of zero
    /// is treated as one.
    pub fn new(capacity: usize) -> (Self, SinkReceivers) {
        let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(16);
        (
            Self {
                events: events_tx,
                errors: errors_tx,
            },
            SinkReceivers {
                events: events_rx,
                errors: errors_rx,
            },
        )
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, kind: EventKind, event: &ClassifiedEvent) -> NtfyResult<()> {
        self.events
            .try_send((kind, event.clone()))
            .map_err(|e| NtfyError::SinkRejected {
                reason: match e {
                    mpsc::error::TrySendError::Full(_) => "channel full".into(),
                    mpsc::error::TrySendError::Closed(_) => "receiver dropped".into(),
                },
            })
    }

    fn report_error(&self, error: NtfyError) {
        tracing::error!(error = %error, "ntfy listener error");
        let _ = self.errors.try_send(error);
    }
}
