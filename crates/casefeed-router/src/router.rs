use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use casefeed_client::EventClient;
use casefeed_core::InboundEvent;

use crate::category::EventCategory;
use crate::filter::EventFilter;
use crate::subscription::{EventSubscription, RoutedEvent};

/// Default capacity of the routed event channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Transparent multiplexer from decoded events to filtered consumers.
///
/// No deduplication or reordering: every published event reaches every
/// matching subscription once.
#[derive(Clone)]
pub struct EventRouter {
    tx: broadcast::Sender<RoutedEvent>,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventRouter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Classify and republish one event. Returns how many subscriptions saw it.
    pub fn publish(&self, event: Arc<InboundEvent>) -> usize {
        let category = EventCategory::classify(&event.event_type);
        debug!(
            event_type = %event.event_type,
            category = category.map_or("none", EventCategory::as_str),
            "routing event"
        );
        self.tx.send(RoutedEvent { category, event }).unwrap_or(0)
    }

    pub fn subscribe(&self, filter: EventFilter) -> EventSubscription {
        EventSubscription::new(self.tx.subscribe(), filter)
    }

    /// Case events, optionally for one `case_id`.
    pub fn case_events(&self, case_id: Option<&str>) -> EventSubscription {
        self.subscribe(correlated(EventCategory::Case, case_id))
    }

    /// Workflow and approval events, optionally for one `workflow_id`.
    pub fn workflow_events(&self, workflow_id: Option<&str>) -> EventSubscription {
        self.subscribe(correlated(EventCategory::Workflow, workflow_id))
    }

    pub fn notification_events(&self) -> EventSubscription {
        self.subscribe(EventFilter::category(EventCategory::Notification))
    }

    pub fn alert_events(&self) -> EventSubscription {
        self.subscribe(EventFilter::category(EventCategory::Alert))
    }

    /// Events with exactly this `type`, classified or not.
    pub fn on_type(&self, event_type: impl Into<String>) -> EventSubscription {
        self.subscribe(EventFilter::event_type(event_type))
    }

    /// Pump events from a client into this router in a background task.
    pub fn attach(&self, client: &EventClient) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(client.events()))
    }

    /// Pump loop. Exits when the event source is dropped.
    #[tracing::instrument(skip_all, name = "event_router")]
    pub async fn run(self, mut rx: broadcast::Receiver<Arc<InboundEvent>>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _ = self.publish(event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "event router lagged behind client");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("event source closed, router exiting");
                    break;
                }
            }
        }
    }
}

fn correlated(category: EventCategory, id: Option<&str>) -> EventFilter {
    let filter = EventFilter::category(category);
    match (id, category.correlation_key()) {
        (Some(id), Some(key)) => filter.correlated(key, id),
        _ => filter,
    }
}
