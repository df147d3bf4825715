//! Notification center: the leaf consumer of routed events.
//!
//! Owns the bounded log, raises transient alerts, and ties the event client's
//! lifecycle to the authentication session. It never feeds back into
//! connection logic except through `start_session`/`end_session`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use casefeed_client::EventClient;
use casefeed_core::{AuthToken, InboundEvent, NotificationId, NotificationRecord, Topic};
use casefeed_router::{EventCategory, EventFilter, EventRouter, EventSubscription};
use casefeed_settings::NotificationSettings;

use crate::alert::AlertSink;
use crate::log::NotificationLog;
use crate::mapping::map_event;

struct Shared {
    log: Mutex<NotificationLog>,
    unread: watch::Sender<usize>,
    records: broadcast::Sender<NotificationRecord>,
    sink: Arc<dyn AlertSink>,
}

impl Shared {
    fn ingest(&self, event: &InboundEvent) -> Option<NotificationRecord> {
        let Some(mapped) = map_event(event) else {
            debug!(event_type = %event.event_type, "no notification mapping");
            return None;
        };
        let record = mapped.record;
        self.update(|log| {
            if let Some(evicted) = log.push(record.clone()) {
                debug!(id = %evicted.id, "evicted oldest notification");
            }
        });
        if mapped.alert {
            self.sink.alert(&record.title, &record.body, record.severity);
        }
        // no listeners is fine
        let _ = self.records.send(record.clone());
        Some(record)
    }

    /// Mutate the log and publish the resulting unread count.
    fn update<R>(&self, f: impl FnOnce(&mut NotificationLog) -> R) -> R {
        let (result, unread) = {
            let mut log = self.log.lock();
            let result = f(&mut log);
            (result, log.unread_count())
        };
        let _ = self.unread.send_if_modified(|count| {
            let changed = *count != unread;
            *count = unread;
            changed
        });
        result
    }
}

const RECORD_BUFFER: usize = 64;

/// Connects on session start, subscribes the default topics, disconnects on
/// session end.
#[derive(Clone)]
struct Session {
    client: EventClient,
    topics: Vec<Topic>,
}

impl Session {
    fn start(&self, token: AuthToken) {
        info!(topics = self.topics.len(), "starting event session");
        for topic in &self.topics {
            self.client.subscribe(topic.clone());
        }
        self.client.connect(Some(token));
    }

    fn end(&self) {
        info!("ending event session");
        self.client.disconnect();
    }
}

/// Turns classified events into log records and alerts.
///
/// Dropping the center stops its consumer task; the client itself is left
/// to its other owners.
pub struct NotificationCenter {
    shared: Arc<Shared>,
    session: Session,
    consumer: JoinHandle<()>,
}

impl NotificationCenter {
    pub fn new(
        client: EventClient,
        router: &EventRouter,
        sink: Arc<dyn AlertSink>,
        settings: &NotificationSettings,
    ) -> Self {
        let (unread, _) = watch::channel(0);
        let (records, _) = broadcast::channel(RECORD_BUFFER);
        let shared = Arc::new(Shared {
            log: Mutex::new(NotificationLog::new(settings.capacity)),
            unread,
            records,
            sink,
        });

        let subscription = router.subscribe(consumer_filter());
        let consumer = tokio::spawn(consume(subscription, Arc::clone(&shared)));

        Self {
            shared,
            session: Session {
                client,
                topics: settings
                    .default_topics
                    .iter()
                    .map(|t| Topic::from(t.as_str()))
                    .collect(),
            },
            consumer,
        }
    }

    pub fn client(&self) -> &EventClient {
        &self.session.client
    }

    // ── session lifecycle ───────────────────────────────────────────

    /// Subscribe the default topics and connect with `token`.
    pub fn start_session(&self, token: AuthToken) {
        self.session.start(token);
    }

    pub fn end_session(&self) {
        self.session.end();
    }

    /// Follow an authentication provider. A token starts the session and
    /// `None` ends it. A refreshed token while connected is ignored: the live
    /// socket keeps the token it opened with. While disconnected or still
    /// connecting, the refreshed token is used for a new attempt. Stops when
    /// the provider's sender is dropped.
    pub fn bind_session(&self, mut auth: watch::Receiver<Option<AuthToken>>) -> JoinHandle<()> {
        let session = self.session.clone();
        tokio::spawn(async move {
            loop {
                let token = auth.borrow_and_update().clone();
                match token {
                    Some(token) => session.start(token),
                    None => session.end(),
                }
                if auth.changed().await.is_err() {
                    debug!("auth provider gone, session binding stopped");
                    break;
                }
            }
        })
    }

    // ── log operations ──────────────────────────────────────────────

    /// Feed one event directly, bypassing the router. Returns the record
    /// that was logged, if the type has a mapping.
    pub fn ingest(&self, event: &InboundEvent) -> Option<NotificationRecord> {
        self.shared.ingest(event)
    }

    pub fn mark_as_read(&self, id: &NotificationId) -> bool {
        self.shared.update(|log| log.mark_as_read(id))
    }

    pub fn mark_as_unread(&self, id: &NotificationId) -> bool {
        self.shared.update(|log| log.mark_as_unread(id))
    }

    pub fn mark_all_as_read(&self) -> usize {
        self.shared.update(NotificationLog::mark_all_as_read)
    }

    pub fn remove(&self, id: &NotificationId) -> Option<NotificationRecord> {
        self.shared.update(|log| log.remove(id))
    }

    pub fn clear_all(&self) {
        self.shared.update(NotificationLog::clear_all);
    }

    pub fn unread_count(&self) -> usize {
        self.shared.log.lock().unread_count()
    }

    /// Unread badge count, updated on every change.
    pub fn unread_counts(&self) -> watch::Receiver<usize> {
        self.shared.unread.subscribe()
    }

    /// Every record as it is logged. Slow receivers lag rather than block
    /// ingestion.
    pub fn records(&self) -> broadcast::Receiver<NotificationRecord> {
        self.shared.records.subscribe()
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.shared.log.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.shared.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.log.lock().is_empty()
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

/// All four categories plus the raw `notification` type. The union is one
/// subscription, so an event matching both is logged once.
fn consumer_filter() -> EventFilter {
    EventCategory::ALL
        .into_iter()
        .fold(EventFilter::event_type("notification"), EventFilter::with_category)
}

async fn consume(mut subscription: EventSubscription, shared: Arc<Shared>) {
    while let Some(routed) = subscription.recv().await {
        let _ = shared.ingest(&routed.event);
    }
    debug!("router closed, notification consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use casefeed_client::testing::MockTransport;
    use casefeed_client::ClientConfig;
    use casefeed_core::{codec, ConnectionState, ControlFrame, Severity};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::alert::{Alert, ChannelAlertSink};

    struct Harness {
        mock: MockTransport,
        router: EventRouter,
        center: NotificationCenter,
        alerts: mpsc::UnboundedReceiver<Alert>,
    }

    fn harness() -> Harness {
        let mock = MockTransport::new();
        let client = EventClient::new(
            ClientConfig::default().with_url("ws://feed.test/ws"),
            Arc::new(mock.clone()),
        );
        let router = EventRouter::default();
        let (sink, alerts) = ChannelAlertSink::channel();
        let center = NotificationCenter::new(
            client,
            &router,
            Arc::new(sink),
            &NotificationSettings::default(),
        );
        Harness {
            mock,
            router,
            center,
            alerts,
        }
    }

    fn event(frame: &str) -> Arc<InboundEvent> {
        Arc::new(codec::decode(frame).unwrap())
    }

    async fn wait_for_len(center: &NotificationCenter, len: usize) {
        timeout(Duration::from_secs(1), async {
            while center.len() < len {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("notification never logged");
    }

    #[tokio::test]
    async fn routed_workflow_failure_logs_and_alerts() {
        let mut h = harness();
        let _ = h.router.publish(event(r#"{"type":"workflow_failed","data":{"workflow_name":"X"}}"#));
        wait_for_len(&h.center, 1).await;

        let records = h.center.notifications();
        assert_eq!(records[0].severity, Severity::Error);
        let alert = timeout(Duration::from_secs(1), h.alerts.recv()).await.unwrap().unwrap();
        assert_eq!(alert.title, "Workflow Failed");
        assert_eq!(alert.severity, Severity::Error);
    }

    #[tokio::test]
    async fn records_are_broadcast_as_logged() {
        let h = harness();
        let mut records = h.center.records();
        let _ = h.center.ingest(&event(r#"{"id":"s1","type":"system_alert","data":{"severity":"warning","message":"disk"}}"#));
        let record = records.try_recv().unwrap();
        assert_eq!(record.id.as_str(), "s1");
        assert!(records.try_recv().is_err());
    }

    #[tokio::test]
    async fn case_update_logs_without_alert() {
        let mut h = harness();
        let _ = h.router.publish(event(r#"{"type":"case_updated","data":{"case_id":"c1"}}"#));
        wait_for_len(&h.center, 1).await;

        assert_eq!(h.center.notifications()[0].severity, Severity::Info);
        assert!(h.alerts.try_recv().is_err());
    }

    #[tokio::test]
    async fn raw_notification_is_logged_once() {
        let h = harness();
        let _ = h.router.publish(event(r#"{"id":"n1","type":"notification","data":{"message":"hi"}}"#));
        let _ = h.router.publish(event(r#"{"id":"n2","type":"case_created","data":{}}"#));
        wait_for_len(&h.center, 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ids: Vec<String> = h.center.notifications().iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["n2", "n1"]);
    }

    #[tokio::test]
    async fn unclassified_events_are_ignored() {
        let h = harness();
        let _ = h.router.publish(event(r#"{"type":"user_login","data":{}}"#));
        let _ = h.router.publish(event(r#"{"type":"case_deleted","data":{}}"#));
        wait_for_len(&h.center, 1).await;
        assert_eq!(h.center.notifications()[0].title, "Case Deleted");
    }

    #[tokio::test]
    async fn unread_counts_track_mutations() {
        let h = harness();
        let mut unread = h.center.unread_counts();
        let a = h.center.ingest(&event(r#"{"id":"a","type":"case_created","data":{}}"#)).unwrap();
        let _ = h.center.ingest(&event(r#"{"id":"b","type":"case_created","data":{}}"#));
        assert_eq!(*unread.borrow_and_update(), 2);

        assert!(h.center.mark_as_read(&a.id));
        assert_eq!(*unread.borrow_and_update(), 1);
        assert!(h.center.mark_as_unread(&a.id));
        assert_eq!(h.center.unread_count(), 2);

        assert_eq!(h.center.mark_all_as_read(), 2);
        assert_eq!(h.center.unread_count(), 0);
        assert_eq!(*unread.borrow_and_update(), 0);

        assert!(h.center.remove(&a.id).is_some());
        assert_eq!(h.center.len(), 1);
        h.center.clear_all();
        assert!(h.center.is_empty());
    }

    #[tokio::test]
    async fn log_operations_do_not_touch_the_connection() {
        let h = harness();
        let _ = h.center.ingest(&event(r#"{"type":"case_created","data":{}}"#));
        let _ = h.center.mark_all_as_read();
        h.center.clear_all();

        let status = h.center.client().status().await.unwrap();
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert!(status.topics.is_empty());
        assert!(h.mock.opens().is_empty());
    }

    #[tokio::test]
    async fn session_start_connects_and_subscribes_defaults() {
        let h = harness();
        let mut states = h.center.client().watch_state();
        h.center.start_session(AuthToken::from("tok"));
        timeout(Duration::from_secs(1), states.wait_for(|s| s.is_connected()))
            .await
            .unwrap()
            .unwrap();
        let status = h.center.client().status().await.unwrap();

        assert_eq!(status.topics.len(), 3);
        assert_eq!(h.mock.opens()[0].url, "ws://feed.test/ws?token=tok");
        let mut sent = h.mock.sent_frames();
        sent.sort_by(|a, b| a.topic.cmp(&b.topic));
        assert_eq!(
            sent,
            vec![
                ControlFrame::subscribe(Topic::from("alerts")),
                ControlFrame::subscribe(Topic::from("cases")),
                ControlFrame::subscribe(Topic::from("workflows")),
            ]
        );

        h.center.end_session();
        timeout(Duration::from_secs(1), states.wait_for(|s| *s == ConnectionState::Disconnected))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(h.mock.closes(), 1);
    }

    #[tokio::test]
    async fn bind_session_follows_auth_provider() {
        let h = harness();
        let (auth_tx, auth_rx) = watch::channel(None::<AuthToken>);
        let mut states = h.center.client().watch_state();
        let binding = h.center.bind_session(auth_rx);

        auth_tx.send_replace(Some(AuthToken::from("t1")));
        timeout(Duration::from_secs(1), states.wait_for(|s| s.is_connected()))
            .await
            .unwrap()
            .unwrap();

        auth_tx.send_replace(None);
        timeout(Duration::from_secs(1), states.wait_for(|s| *s == ConnectionState::Disconnected))
            .await
            .unwrap()
            .unwrap();

        drop(auth_tx);
        timeout(Duration::from_secs(1), binding).await.unwrap().unwrap();
        assert_eq!(h.mock.opens().len(), 1);
    }

    #[tokio::test]
    async fn refreshed_token_keeps_live_connection() {
        let h = harness();
        let (auth_tx, auth_rx) = watch::channel(Some(AuthToken::from("t1")));
        let mut states = h.center.client().watch_state();
        let _binding = h.center.bind_session(auth_rx);
        timeout(Duration::from_secs(1), states.wait_for(|s| s.is_connected()))
            .await
            .unwrap()
            .unwrap();

        auth_tx.send_replace(Some(AuthToken::from("t2")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let status = h.center.client().status().await.unwrap();

        assert_eq!(status.state, ConnectionState::Connected);
        let urls: Vec<String> = h.mock.opens().into_iter().map(|o| o.url).collect();
        assert_eq!(urls, vec!["ws://feed.test/ws?token=t1"]);
        assert_eq!(h.mock.closes(), 0);
    }
}
