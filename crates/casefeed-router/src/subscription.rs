use std::sync::Arc;

use futures::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use casefeed_core::InboundEvent;

use crate::category::EventCategory;
use crate::filter::EventFilter;

/// An event after classification.
#[derive(Clone, Debug)]
pub struct RoutedEvent {
    pub category: Option<EventCategory>,
    pub event: Arc<InboundEvent>,
}

/// A consumer's filtered view of the routed event stream.
pub struct EventSubscription {
    rx: broadcast::Receiver<RoutedEvent>,
    filter: EventFilter,
}

impl EventSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<RoutedEvent>, filter: EventFilter) -> Self {
        Self { rx, filter }
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Next matching event. `None` once the router is gone.
    ///
    /// A consumer that falls behind skips the overwritten events and keeps
    /// going.
    pub async fn recv(&mut self) -> Option<RoutedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(routed) if self.filter.matches(routed.category, &routed.event) => {
                    return Some(routed)
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = RoutedEvent> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|routed| (routed, sub))
        })
    }
}
