use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A captured log record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: u64,
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    pub fields: Option<String>,
    pub topic: Option<String>,
}

/// Query parameters for searching captured logs.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    pub level: Option<String>,
    pub target: Option<String>,
    pub topic: Option<String>,
    pub since: Option<String>,
    pub limit: Option<usize>,
}

/// Bounded in-memory sink for warn+ logs. Oldest records are dropped once
/// `capacity` is reached.
pub struct MemoryLogSink {
    capacity: usize,
    inner: Mutex<SinkInner>,
}

struct SinkInner {
    next_id: u64,
    records: VecDeque<LogRecord>,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(SinkInner {
                next_id: 1,
                records: VecDeque::with_capacity(capacity),
            }),
        }
    }

    fn insert(&self, record: LogInsert) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        if inner.records.len() == self.capacity {
            let _ = inner.records.pop_front();
        }
        inner.records.push_back(LogRecord {
            id,
            timestamp: record.timestamp,
            level: record.level,
            target: record.target,
            message: record.message,
            fields: record.fields,
            topic: record.topic,
        });
    }

    /// Matching records, most recent first.
    pub fn query(&self, q: &LogQuery) -> Vec<LogRecord> {
        let inner = self.inner.lock();
        let limit = q.limit.unwrap_or(100);
        inner
            .records
            .iter()
            .rev()
            .filter(|r| q.level.as_ref().map_or(true, |l| r.level.eq_ignore_ascii_case(l)))
            .filter(|r| q.target.as_ref().map_or(true, |t| r.target.contains(t.as_str())))
            .filter(|r| q.topic.as_ref().map_or(true, |t| r.topic.as_ref() == Some(t)))
            .filter(|r| q.since.as_ref().map_or(true, |s| r.timestamp.as_str() >= s.as_str()))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().records.len()
    }
}

struct LogInsert {
    timestamp: String,
    level: String,
    target: String,
    message: String,
    fields: Option<String>,
    topic: Option<String>,
}

/// tracing Layer that captures warn+ events into a [`MemoryLogSink`].
pub struct MemoryLogLayer {
    sink: Arc<MemoryLogSink>,
}

impl MemoryLogLayer {
    pub fn new(sink: Arc<MemoryLogSink>) -> Self {
        Self { sink }
    }
}

/// Visitor that extracts fields from a tracing event.
struct FieldVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
    topic: Option<String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: serde_json::Map::new(),
            topic: None,
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        match field.name() {
            "message" => self.message = Some(val),
            "topic" => self.topic = Some(val.trim_matches('"').to_string()),
            name => {
                let _ = self
                    .fields
                    .insert(name.to_string(), serde_json::Value::String(val));
            }
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "topic" => self.topic = Some(value.to_string()),
            name => {
                let _ = self
                    .fields
                    .insert(name.to_string(), serde_json::Value::String(value.to_string()));
            }
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

impl<S> Layer<S> for MemoryLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > tracing::Level::WARN {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let fields = if visitor.fields.is_empty() {
            None
        } else {
            serde_json::to_string(&visitor.fields).ok()
        };

        self.sink.insert(LogInsert {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields,
            topic: visitor.topic,
        });
    }
}
