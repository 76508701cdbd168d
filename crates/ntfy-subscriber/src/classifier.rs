//! # Message Classifier
//!
//! Turns raw WebSocket text frames into [`Classification`]s:
//!
//! ```text
//! frame ─┬─ JSON object ─┬─ event open/keepalive ────────────► Control
//!        │               ├─ no message, no title, not a
//!        │               │  message event with an id ────────► NoContent
//!        │               └─ otherwise ───────────────────────► Content
//!        └─ anything else ─┬─ blank after trim ──────────────► Empty
//!                          └─ otherwise (plain text) ────────► Content
//! ```
//!
//! Content is attributed to a kind by matching its `topic` against the
//! configured commands/responses topics. Content on any other topic is
//! still forwarded, as [`EventKind::Unknown`].

use serde_json::{Map, Value};

use crate::protocol::{ClassifiedEvent, EventKind, Events, InboundFrame, TopicSet};

/// Outcome of classifying one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Protocol-level `open` or `keepalive` event.
    Control { event: String },

    /// Well-formed JSON carrying nothing worth forwarding.
    NoContent,

    /// Plain text that is blank after trimming.
    Empty,

    /// An event for the sink.
    Content(ClassifiedEvent),
}

impl Classification {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Control { .. } => "control",
            Classification::NoContent => "no-content",
            Classification::Empty => "empty",
            Classification::Content(_) => "content",
        }
    }
}

/// Classifies frames for one subscription.
#[derive(Debug, Clone)]
pub struct Classifier {
    topics: TopicSet,
}

impl Classifier {
    pub fn new(topics: TopicSet) -> Self {
        Self { topics }
    }

    pub fn classify(&self, frame: &InboundFrame) -> Classification {
        match serde_json::from_str::<Value>(&frame.text) {
            Ok(Value::Object(fields)) => self.classify_json(&fields, frame),
            // Non-object JSON ("42", "true") carries no ntfy fields; treat
            // it as text like any other unparseable payload.
            Ok(_) | Err(_) => self.classify_plain(frame),
        }
    }

    fn classify_json(&self, fields: &Map<String, Value>, frame: &InboundFrame) -> Classification {
        let event = string_field(fields, "event");
        if let Some(event) = event.filter(|e| Events::is_control(e)) {
            return Classification::Control {
                event: event.to_string(),
            };
        }

        let id = string_field(fields, "id");
        let message = string_field(fields, "message");
        let title = string_field(fields, "title");
        let is_message_event = event == Some(Events::MESSAGE) && id.is_some();
        if message.is_none() && title.is_none() && !is_message_event {
            return Classification::NoContent;
        }

        let (topic, kind) = match string_field(fields, "topic") {
            Some(topic) => (topic.to_string(), self.topics.kind_of(topic)),
            None => self.fallback_topic(),
        };

        let tags = fields.get("tags").and_then(Value::as_array).map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });
        let priority = fields
            .get("priority")
            .and_then(Value::as_u64)
            .and_then(|p| u8::try_from(p).ok());

        Classification::Content(ClassifiedEvent {
            kind,
            id: id.map_or_else(|| generated_id("msg", frame), str::to_string),
            time: fields
                .get("time")
                .and_then(Value::as_i64)
                .unwrap_or_else(|| frame.received_at.timestamp()),
            topic,
            message: message.unwrap_or_default().to_string(),
            title: title.map(str::to_string),
            tags,
            priority,
            event: event.map(str::to_string),
            received_at: frame.received_at,
        })
    }

    fn classify_plain(&self, frame: &InboundFrame) -> Classification {
        let text = frame.text.trim();
        if text.is_empty() {
            return Classification::Empty;
        }

        let (topic, kind) = self.fallback_topic();
        Classification::Content(ClassifiedEvent {
            kind,
            id: generated_id("text", frame),
            time: frame.received_at.timestamp(),
            topic,
            message: text.to_string(),
            title: None,
            tags: None,
            priority: None,
            event: None,
            received_at: frame.received_at,
        })
    }

    /// Topic for frames that do not name one. Unambiguous only when a
    /// single topic is subscribed.
    fn fallback_topic(&self) -> (String, EventKind) {
        match self.topics.single() {
            Some(topic) => (topic.to_string(), self.topics.kind_of(topic)),
            None => (self.topics.joined(), EventKind::Unknown),
        }
    }
}

/// Non-empty string value of `key`.
fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn generated_id(prefix: &str, frame: &InboundFrame) -> String {
    format!("{prefix}_{}", frame.received_at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn classifier() -> Classifier {
        Classifier::new(TopicSet::new(Some("cmd"), Some("resp")))
    }

    fn frame(text: &str) -> InboundFrame {
        InboundFrame::at(text, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    fn content(classification: Classification) -> ClassifiedEvent {
        match classification {
            Classification::Content(event) => event,
            other => panic!("expected content, got {other:?}"),
        }
    }

    #[test]
    fn test_response_topic_round_trip() {
        let text = json!({"message": "M", "title": "T", "topic": "resp"}).to_string();
        let event = content(classifier().classify(&frame(&text)));

        assert_eq!(event.kind, EventKind::Response);
        assert_eq!(event.message, "M");
        assert_eq!(event.title.as_deref(), Some("T"));
        assert_eq!(event.topic, "resp");
        assert_eq!(event.id, "msg_1748779200000");
        assert_eq!(event.time, 1_748_779_200);
    }

    #[test]
    fn test_full_ntfy_message() {
        let text = json!({
            "id": "sPs71M8A2T",
            "time": 1_700_000_000,
            "event": "message",
            "topic": "cmd",
            "message": "reboot",
            "tags": ["warning", 7, "boat"],
            "priority": 4
        })
        .to_string();
        let event = content(classifier().classify(&frame(&text)));

        assert_eq!(event.kind, EventKind::Command);
        assert_eq!(event.id, "sPs71M8A2T");
        assert_eq!(event.time, 1_700_000_000);
        assert_eq!(
            event.tags,
            Some(vec!["warning".to_string(), "boat".to_string()])
        );
        assert_eq!(event.priority, Some(4));
        assert_eq!(event.event.as_deref(), Some("message"));
    }

    #[test]
    fn test_control_events() {
        for name in ["open", "keepalive"] {
            let text = json!({"id": "x", "event": name, "topic": "cmd,resp"}).to_string();
            assert_eq!(
                classifier().classify(&frame(&text)),
                Classification::Control {
                    event: name.to_string()
                }
            );
        }
    }

    #[test]
    fn test_control_event_with_message_is_still_control() {
        let text = json!({"event": "keepalive", "message": "hi"}).to_string();
        assert!(matches!(
            classifier().classify(&frame(&text)),
            Classification::Control { .. }
        ));
    }

    #[test]
    fn test_no_content() {
        for value in [
            json!({}),
            json!({"event": "poll_request", "topic": "cmd"}),
            json!({"event": "message"}),
            json!({"message": "", "title": ""}),
            json!({"message": 12}),
        ] {
            assert_eq!(
                classifier().classify(&frame(&value.to_string())),
                Classification::NoContent,
                "{value}"
            );
        }
    }

    #[test]
    fn test_message_event_with_id_but_no_text() {
        let text = json!({"event": "message", "id": "abc", "topic": "resp"}).to_string();
        let event = content(classifier().classify(&frame(&text)));
        assert_eq!(event.id, "abc");
        assert_eq!(event.message, "");
        assert_eq!(event.kind, EventKind::Response);
    }

    #[test]
    fn test_title_only_is_content() {
        let text = json!({"title": "Anchor alarm", "topic": "cmd"}).to_string();
        let event = content(classifier().classify(&frame(&text)));
        assert_eq!(event.message, "");
        assert_eq!(event.title.as_deref(), Some("Anchor alarm"));
    }

    #[test]
    fn test_unknown_topic_forwarded() {
        let text = json!({"message": "hi", "topic": "elsewhere"}).to_string();
        let event = content(classifier().classify(&frame(&text)));
        assert_eq!(event.kind, EventKind::Unknown);
        assert_eq!(event.topic, "elsewhere");
    }

    #[test]
    fn test_plain_text_trimmed() {
        let event = content(classifier().classify(&frame("  hello  ")));
        assert_eq!(event.message, "hello");
        assert!(!event.id.is_empty());
        assert!(event.id.starts_with("text_"));
        assert_eq!(event.time, 1_748_779_200);
        assert_eq!(event.kind, EventKind::Unknown);
        assert_eq!(event.topic, "cmd,resp");
    }

    #[test]
    fn test_plain_text_attributed_to_single_topic() {
        let classifier = Classifier::new(TopicSet::new(None, Some("resp")));
        let event = content(classifier.classify(&frame("yes, actionId:42")));
        assert_eq!(event.kind, EventKind::Response);
        assert_eq!(event.topic, "resp");
    }

    #[test]
    fn test_non_object_json_is_plain_text() {
        let event = content(classifier().classify(&frame("42")));
        assert_eq!(event.message, "42");
        assert!(event.event.is_none());
    }

    #[test]
    fn test_blank_plain_text_discarded() {
        assert_eq!(classifier().classify(&frame("   \n\t")), Classification::Empty);
        assert_eq!(classifier().classify(&frame("")), Classification::Empty);
    }

    #[test]
    fn test_out_of_range_priority_dropped() {
        let text = json!({"message": "m", "topic": "cmd", "priority": 900}).to_string();
        assert_eq!(content(classifier().classify(&frame(&text))).priority, None);
    }
}
