//! The set of topics a listener subscribes to.

use super::event::EventKind;

/// Ordered set of distinct topic names: the commands topic first, then the
/// responses topic. Blank names are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSet {
    commands: Option<String>,
    responses: Option<String>,
}

impl TopicSet {
    pub fn new(commands: Option<&str>, responses: Option<&str>) -> Self {
        Self {
            commands: normalize(commands),
            responses: normalize(responses),
        }
    }

    pub fn commands(&self) -> Option<&str> {
        self.commands.as_deref()
    }

    pub fn responses(&self) -> Option<&str> {
        self.responses.as_deref()
    }

    /// Topic names in subscription order, without duplicates.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(2);
        if let Some(commands) = self.commands() {
            names.push(commands);
        }
        if let Some(responses) = self.responses() {
            if !names.contains(&responses) {
                names.push(responses);
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_none() && self.responses.is_none()
    }

    /// Comma-joined topic list as used in the subscription URL.
    pub fn joined(&self) -> String {
        self.names().join(",")
    }

    /// Attribute a topic name to a kind. The commands topic wins when both
    /// topics share a name.
    pub fn kind_of(&self, topic: &str) -> EventKind {
        if self.commands() == Some(topic) {
            EventKind::Command
        } else if self.responses() == Some(topic) {
            EventKind::Response
        } else {
            EventKind::Unknown
        }
    }

    /// The only subscribed topic, if exactly one is subscribed.
    pub fn single(&self) -> Option<&str> {
        match self.names().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

fn normalize(topic: Option<&str>) -> Option<String> {
    topic
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
