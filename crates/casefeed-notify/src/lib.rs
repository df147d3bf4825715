//! # casefeed-notify
//!
//! Leaf consumer of routed events. Maps case, workflow, notification and
//! alert events into [`NotificationRecord`](casefeed_core::NotificationRecord)s
//! kept in a bounded newest-first log, raises transient alerts for the types
//! that warrant one, and drives the event client's session lifecycle.

pub mod alert;
pub mod center;
pub mod log;
pub mod mapping;

pub use alert::{Alert, AlertSink, ChannelAlertSink, TracingAlertSink};
pub use center::NotificationCenter;
pub use log::NotificationLog;
pub use mapping::{is_mapped, map_event, Mapped};
