//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FeedSettings::default()`]
//! 2. If `~/.casefeed/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `CASEFEED_*` environment overrides (highest priority)
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::FeedSettings;

/// Resolve the path to the settings file (`~/.casefeed/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".casefeed").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FeedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<FeedSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<FeedSettings> {
    let defaults = serde_json::to_value(FeedSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `CASEFEED_*` environment variables.
pub fn apply_env_overrides(settings: &mut FeedSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup. Invalid values are logged and
/// ignored, falling back to the file/default value.
pub fn apply_overrides(settings: &mut FeedSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("CASEFEED_URL") {
        settings.client.url = v;
    }
    if let Some(v) = read("CASEFEED_MAX_RECONNECT_ATTEMPTS") {
        match parse_u64_range(&v, 0, 100) {
            Some(n) => settings.client.max_reconnect_attempts = n as u32,
            None => warn_invalid("CASEFEED_MAX_RECONNECT_ATTEMPTS", &v),
        }
    }
    if let Some(v) = read("CASEFEED_RECONNECT_BASE_DELAY_MS") {
        match parse_u64_range(&v, 1, 600_000) {
            Some(n) => settings.client.reconnect_base_delay_ms = n,
            None => warn_invalid("CASEFEED_RECONNECT_BASE_DELAY_MS", &v),
        }
    }
    if let Some(v) = read("CASEFEED_KEEPALIVE_INTERVAL_MS") {
        match parse_u64_range(&v, 1000, 600_000) {
            Some(n) => settings.client.keepalive_interval_ms = n,
            None => warn_invalid("CASEFEED_KEEPALIVE_INTERVAL_MS", &v),
        }
    }
    if let Some(v) = read("CASEFEED_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("CASEFEED_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn_invalid("CASEFEED_LOG_JSON", &v),
        }
    }
}

/// Reject settings the client cannot run with.
pub fn validate(settings: &FeedSettings) -> Result<()> {
    let url = &settings.client.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(SettingsError::invalid(
            "client.url",
            format!("must start with ws:// or wss://, got {url}"),
        ));
    }
    if settings.notifications.capacity == 0 {
        return Err(SettingsError::invalid("notifications.capacity", "must be at least 1"));
    }
    if settings.client.event_buffer_size == 0 {
        return Err(SettingsError::invalid("client.eventBufferSize", "must be at least 1"));
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}
