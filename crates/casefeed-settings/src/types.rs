//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`,
//! so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};

/// Root settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSettings {
    pub client: ClientSettings,
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
}

/// Connection behaviour of the event client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Base WebSocket endpoint, without the token query parameter.
    pub url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub keepalive_interval_ms: u64,
    pub connect_timeout_ms: u64,
    /// Capacity of the inbound event broadcast channel.
    pub event_buffer_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            keepalive_interval_ms: 30_000,
            connect_timeout_ms: 10_000,
            event_buffer_size: 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    /// Maximum records kept in the log; oldest are evicted first.
    pub capacity: usize,
    /// Topics subscribed when a session starts.
    pub default_topics: Vec<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            default_topics: vec![
                "cases".to_string(),
                "workflows".to_string(),
                "alerts".to_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// How many recent warn+ records to keep in memory. Zero disables capture.
    pub capture_recent: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            capture_recent: 200,
        }
    }
}
