//! Inbound frames and classified events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::Paths;

/// Which configured topic a content event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Command,
    Response,
    /// The event's topic matched neither configured topic. Forwarded rather
    /// than dropped so misconfigured topics show up downstream.
    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Command => "command",
            EventKind::Response => "response",
            EventKind::Unknown => "unknown",
        }
    }

    /// Downstream data path for events of this kind.
    pub fn path(self) -> &'static str {
        match self {
            EventKind::Command => Paths::COMMANDS,
            EventKind::Response => Paths::RESPONSES,
            EventKind::Unknown => Paths::UNKNOWN,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw text frame as it came off the socket.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self::at(text, Utc::now())
    }

    pub fn at(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            received_at,
        }
    }
}

/// A content event, normalized for downstream delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEvent {
    pub kind: EventKind,
    pub id: String,
    /// Unix time in seconds, from the message or the arrival time.
    pub time: i64,
    pub topic: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// The ntfy `event` field, absent for plain-text frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_paths() {
        assert_eq!(EventKind::Command.path(), "communications.ntfy.commands");
        assert_eq!(EventKind::Response.path(), "communications.ntfy.responses");
        assert_eq!(EventKind::Unknown.path(), "communications.ntfy.unknown");
        assert_eq!(EventKind::Response.to_string(), "response");
    }

    #[test]
    fn test_event_serializes_camel_case_without_empty_fields() {
        let event = ClassifiedEvent {
            kind: EventKind::Response,
            id: "abc".into(),
            time: 1_700_000_000,
            topic: "resp".into(),
            message: "M".into(),
            title: None,
            tags: None,
            priority: Some(4),
            event: Some("message".into()),
            received_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "response");
        assert_eq!(json["priority"], 4);
        assert_eq!(json["receivedAt"], "2024-01-02T03:04:05Z");
        assert!(json.get("title").is_none());
        assert!(json.get("tags").is_none());
    }
}
