use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::NotificationId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Lenient parse of a server-supplied severity. Unknown values yield `None`
    /// so callers can apply their own fallback.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-visible entry in the notification log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub timestamp: String,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parse_lenient() {
        assert_eq!(Severity::parse("ERROR"), Some(Severity::Error));
        assert_eq!(Severity::parse(" warn "), Some(Severity::Warning));
        assert_eq!(Severity::parse("success"), Some(Severity::Success));
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn severity_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn record_omits_missing_link() {
        let record = NotificationRecord {
            id: NotificationId::from("n1"),
            title: "t".into(),
            body: "b".into(),
            severity: Severity::Info,
            timestamp: "2026-01-01T00:00:00Z".into(),
            read: false,
            link: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("link"));
        assert!(json.contains("\"id\":\"n1\""));
    }
}
