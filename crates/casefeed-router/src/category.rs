use serde::{Deserialize, Serialize};
use std::fmt;

const CASE_TYPES: &[&str] = &["case_created", "case_updated", "case_deleted", "case_assigned"];

const WORKFLOW_TYPES: &[&str] = &[
    "workflow_started",
    "workflow_completed",
    "workflow_failed",
    "approval_required",
    "approval_resolved",
];

const NOTIFICATION_TYPES: &[&str] = &["notification", "system_alert"];

const ALERT_TYPES: &[&str] = &["alert_created", "detection_hit"];

/// Domain category of an inbound event, derived from its `type` tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Case,
    Workflow,
    Notification,
    Alert,
}

impl EventCategory {
    pub const ALL: [Self; 4] = [Self::Case, Self::Workflow, Self::Notification, Self::Alert];

    /// `None` for types outside every category; those are still routed to
    /// consumers that asked for the exact type.
    pub fn classify(event_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.event_types().contains(&event_type))
    }

    pub fn event_types(self) -> &'static [&'static str] {
        match self {
            Self::Case => CASE_TYPES,
            Self::Workflow => WORKFLOW_TYPES,
            Self::Notification => NOTIFICATION_TYPES,
            Self::Alert => ALERT_TYPES,
        }
    }

    /// `data` field that identifies the subject of events in this category.
    pub fn correlation_key(self) -> Option<&'static str> {
        match self {
            Self::Case => Some("case_id"),
            Self::Workflow => Some("workflow_id"),
            Self::Notification | Self::Alert => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Workflow => "workflow",
            Self::Notification => "notification",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_every_known_type() {
        for category in EventCategory::ALL {
            for event_type in category.event_types() {
                assert_eq!(EventCategory::classify(event_type), Some(category));
            }
        }
    }

    #[test]
    fn classify_examples() {
        assert_eq!(EventCategory::classify("case_assigned"), Some(EventCategory::Case));
        assert_eq!(EventCategory::classify("approval_required"), Some(EventCategory::Workflow));
        assert_eq!(EventCategory::classify("system_alert"), Some(EventCategory::Notification));
        assert_eq!(EventCategory::classify("detection_hit"), Some(EventCategory::Alert));
    }

    #[test]
    fn unknown_and_near_miss_types_are_unclassified() {
        assert_eq!(EventCategory::classify("user_login"), None);
        assert_eq!(EventCategory::classify("Case_Created"), None);
        assert_eq!(EventCategory::classify(""), None);
    }

    #[test]
    fn categories_are_disjoint() {
        let total: usize = EventCategory::ALL.iter().map(|c| c.event_types().len()).sum();
        assert_eq!(total, 13);
    }

    #[test]
    fn correlation_keys() {
        assert_eq!(EventCategory::Case.correlation_key(), Some("case_id"));
        assert_eq!(EventCategory::Workflow.correlation_key(), Some("workflow_id"));
        assert_eq!(EventCategory::Alert.correlation_key(), None);
    }
}
