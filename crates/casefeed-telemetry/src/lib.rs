mod logging;

pub use logging::{LogQuery, LogRecord, MemoryLogLayer, MemoryLogSink};

use std::str::FromStr;
use std::sync::Arc;

use casefeed_settings::LoggingSettings;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "casefeed_client" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// JSON lines on stdout instead of human-readable output.
    pub json: bool,
    /// Number of recent warn+ records kept in memory. Zero disables capture.
    pub capture_recent: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
            capture_recent: 200,
        }
    }
}

impl From<&LoggingSettings> for TelemetryConfig {
    fn from(settings: &LoggingSettings) -> Self {
        let log_level = Level::from_str(&settings.level).unwrap_or(Level::INFO);
        Self {
            log_level,
            module_levels: Vec::new(),
            json: settings.json,
            capture_recent: settings.capture_recent,
        }
    }
}

/// Handle returned by [`init_telemetry`]. Keep it alive for the process
/// lifetime to query captured logs.
pub struct TelemetryGuard {
    log_sink: Option<Arc<MemoryLogSink>>,
}

impl TelemetryGuard {
    /// Access the in-memory sink of recent warn+ logs.
    pub fn logs(&self) -> Option<&MemoryLogSink> {
        self.log_sink.as_deref()
    }
}

fn filter_directives(config: &TelemetryConfig) -> String {
    let mut filter_str = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    filter_str
}

fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(config)))
}

/// Initialize the telemetry subsystem. Call once at startup.
///
/// A second call leaves the existing global subscriber in place.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter(&config))
    });
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter(&config))
    });

    let (memory_layer, memory_sink) = if config.capture_recent > 0 {
        let sink = Arc::new(MemoryLogSink::new(config.capture_recent));
        (Some(MemoryLogLayer::new(sink.clone())), Some(sink))
    } else {
        (None, None)
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(memory_layer)
        .try_init()
    {
        eprintln!("casefeed-telemetry: subscriber already installed: {e}");
    }

    TelemetryGuard {
        log_sink: memory_sink,
    }
}
