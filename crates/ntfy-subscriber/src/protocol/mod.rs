//! ntfy subscription protocol types.
//!
//! - [`constants`]: event names, downstream paths, URL fragments.
//! - [`topics`]: the configured command/response topic pair.
//! - [`event`]: inbound frames and the classified events built from them.

pub mod constants;
pub mod event;
pub mod topics;

pub use constants::{Events, Paths};
pub use event::{ClassifiedEvent, EventKind, InboundFrame};
pub use topics::TopicSet;
