use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::Topic;

/// An event pushed by the server. Immutable once decoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Server-assigned id. Empty when the server omitted it.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    /// ISO-8601 as sent by the server; not reparsed.
    #[serde(default)]
    pub timestamp: String,
}

impl InboundEvent {
    pub fn new(event_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            event_type: event_type.into(),
            data,
            timestamp: String::new(),
        }
    }

    /// String field from `data`, ignoring empty strings.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Whether `data[key]` identifies `expected`. Numbers compare by their
    /// decimal rendering so `{"case_id": 42}` matches `"42"`.
    pub fn correlates(&self, key: &str, expected: &str) -> bool {
        match self.data.get(key) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Number(n)) => n.to_string() == expected,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Subscribe,
    Unsubscribe,
    Ping,
}

/// Outbound instruction to the server. Built by the client, never by
/// application code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub action: ControlAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
}

impl ControlFrame {
    pub fn subscribe(topic: Topic) -> Self {
        Self {
            action: ControlAction::Subscribe,
            topic: Some(topic),
        }
    }

    pub fn unsubscribe(topic: Topic) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            topic: Some(topic),
        }
    }

    pub fn ping() -> Self {
        Self {
            action: ControlAction::Ping,
            topic: None,
        }
    }
}
