use tokio::sync::mpsc;

use casefeed_core::Severity;

/// Receiver of transient, fire-and-forget alerts (toasts, banners, ...).
pub trait AlertSink: Send + Sync {
    fn alert(&self, title: &str, body: &str, severity: Severity);
}

impl<F> AlertSink for F
where
    F: Fn(&str, &str, Severity) + Send + Sync,
{
    fn alert(&self, title: &str, body: &str, severity: Severity) {
        self(title, body, severity);
    }
}

/// Writes alerts to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, title: &str, body: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::error!(title, body, "alert"),
            Severity::Warning => tracing::warn!(title, body, "alert"),
            Severity::Info | Severity::Success => tracing::info!(title, body, %severity, "alert"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Forwards alerts into a channel for a UI loop to drain.
#[derive(Clone, Debug)]
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn alert(&self, title: &str, body: &str, severity: Severity) {
        // receiver gone means nobody is displaying alerts anymore
        let _ = self.tx.send(Alert {
            title: title.to_string(),
            body: body.to_string(),
            severity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn closure_is_a_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |title: &str, _body: &str, severity: Severity| {
            captured.lock().push((title.to_string(), severity));
        };
        sink.alert("Workflow Failed", "X has failed", Severity::Error);
        assert_eq!(*seen.lock(), vec![("Workflow Failed".to_string(), Severity::Error)]);
    }

    #[test]
    fn channel_sink_forwards() {
        let (sink, mut rx) = ChannelAlertSink::channel();
        sink.alert("t", "b", Severity::Warning);
        assert_eq!(
            rx.try_recv().unwrap(),
            Alert {
                title: "t".into(),
                body: "b".into(),
                severity: Severity::Warning,
            }
        );
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (sink, rx) = ChannelAlertSink::channel();
        drop(rx);
        sink.alert("t", "b", Severity::Info);
    }
}
