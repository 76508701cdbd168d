//! Protocol constants for ntfy event names and data paths.

/// Known values of the `event` field in ntfy WebSocket frames.
pub struct Events;

impl Events {
    /// Sent once by the server right after the subscription is established.
    pub const OPEN: &'static str = "open";

    /// Periodic server heartbeat; carries no user content.
    pub const KEEPALIVE: &'static str = "keepalive";

    /// A published message.
    pub const MESSAGE: &'static str = "message";

    /// Returns `true` for events that only signal connection health.
    pub fn is_control(event: &str) -> bool {
        matches!(event, Self::OPEN | Self::KEEPALIVE)
    }
}

/// Downstream data paths classified events are published under.
pub struct Paths;

impl Paths {
    /// Events received on the commands topic.
    pub const COMMANDS: &'static str = "communications.ntfy.commands";

    /// Events received on the responses topic.
    pub const RESPONSES: &'static str = "communications.ntfy.responses";

    /// Events whose topic matched neither configured topic.
    pub const UNKNOWN: &'static str = "communications.ntfy.unknown";
}

/// Path segment appended after the topic list to reach the WebSocket endpoint.
pub const WS_PATH_SUFFIX: &str = "ws";

/// Query parameter carrying the base64-encoded `Authorization` header.
pub const AUTH_QUERY_PARAM: &str = "auth";
