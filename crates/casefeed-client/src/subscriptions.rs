use std::collections::BTreeSet;

use casefeed_core::{ControlFrame, Topic};

/// Desired topic membership, independent of connection state.
///
/// Membership survives reconnects and is only removed by an explicit
/// unsubscribe. Iteration order is sorted, which keeps replay and status
/// output stable; the server does not care about order.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: BTreeSet<Topic>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the topic was not already present.
    pub fn insert(&mut self, topic: Topic) -> bool {
        self.topics.insert(topic)
    }

    /// Returns `true` if the topic was present.
    pub fn remove(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic)
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.topics.iter().cloned().collect()
    }

    /// One subscribe frame per member, sent right after each connect.
    pub fn replay_frames(&self) -> Vec<ControlFrame> {
        self.topics.iter().cloned().map(ControlFrame::subscribe).collect()
    }
}
