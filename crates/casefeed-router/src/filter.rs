use std::collections::HashSet;

use casefeed_core::InboundEvent;

use crate::category::EventCategory;

/// Which routed events a consumer wants.
///
/// An event is selected when its category or its exact `type` was asked
/// for; a filter that names neither selects everything. The optional
/// correlation is a pure predicate over `data`, applied after selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    categories: HashSet<EventCategory>,
    types: HashSet<String>,
    correlation: Option<(String, String)>,
}

impl EventFilter {
    /// Matches every event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(category: EventCategory) -> Self {
        Self::default().with_category(category)
    }

    pub fn event_type(event_type: impl Into<String>) -> Self {
        Self::default().with_type(event_type)
    }

    #[must_use]
    pub fn with_category(mut self, category: EventCategory) -> Self {
        let _ = self.categories.insert(category);
        self
    }

    #[must_use]
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        let _ = self.types.insert(event_type.into());
        self
    }

    /// Keep only events whose `data[key]` identifies `value`.
    #[must_use]
    pub fn correlated(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.correlation = Some((key.into(), value.into()));
        self
    }

    pub fn matches(&self, category: Option<EventCategory>, event: &InboundEvent) -> bool {
        let selected = (self.categories.is_empty() && self.types.is_empty())
            || category.is_some_and(|c| self.categories.contains(&c))
            || self.types.contains(&event.event_type);
        selected
            && self
                .correlation
                .as_ref()
                .map_or(true, |(key, value)| event.correlates(key, value))
    }
}
