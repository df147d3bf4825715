//! Event → notification mapping tables.
//!
//! One [`Rule`] per event type fixes the title, severity, whether a transient
//! alert fires, and how the body and link are built from `data`. Every
//! optional field has fallback text so a sparse event still produces a
//! readable record.

use chrono::Utc;
use serde_json::Value;

use casefeed_core::{InboundEvent, NotificationId, NotificationRecord, Severity};

/// A mapped event: the record to log and whether to raise an alert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mapped {
    pub record: NotificationRecord,
    pub alert: bool,
}

enum SeverityRule {
    Fixed(Severity),
    /// `data.severity` if it parses, otherwise the fallback.
    FromData(Severity),
    /// Alert levels (`critical`/`high`/`medium`/`low`).
    AlertLevel,
    /// `data.decision` or `data.approved` of an approval.
    Decision,
}

struct Rule {
    event_type: &'static str,
    title: &'static str,
    /// Prefer `data.title` over the fixed title.
    title_from_data: bool,
    severity: SeverityRule,
    alert: bool,
    body: fn(&InboundEvent) -> String,
    link: fn(&InboundEvent) -> Option<String>,
}

const RULES: &[Rule] = &[
    // ── cases: never alert ──────────────────────────────────────────
    Rule {
        event_type: "case_created",
        title: "New Case Created",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Info),
        alert: false,
        body: case_created_body,
        link: case_link,
    },
    Rule {
        event_type: "case_updated",
        title: "Case Updated",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Info),
        alert: false,
        body: case_updated_body,
        link: case_link,
    },
    Rule {
        event_type: "case_deleted",
        title: "Case Deleted",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Warning),
        alert: false,
        body: case_deleted_body,
        link: no_link,
    },
    Rule {
        event_type: "case_assigned",
        title: "Case Assigned",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Info),
        alert: false,
        body: case_assigned_body,
        link: case_link,
    },
    // ── workflows: alert on failure and pending approval ────────────
    Rule {
        event_type: "workflow_started",
        title: "Workflow Started",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Info),
        alert: false,
        body: workflow_started_body,
        link: workflow_link,
    },
    Rule {
        event_type: "workflow_completed",
        title: "Workflow Completed",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Success),
        alert: false,
        body: workflow_completed_body,
        link: workflow_link,
    },
    Rule {
        event_type: "workflow_failed",
        title: "Workflow Failed",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Error),
        alert: true,
        body: workflow_failed_body,
        link: workflow_link,
    },
    Rule {
        event_type: "approval_required",
        title: "Approval Required",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Warning),
        alert: true,
        body: approval_required_body,
        link: approval_link,
    },
    Rule {
        event_type: "approval_resolved",
        title: "Approval Resolved",
        title_from_data: false,
        severity: SeverityRule::Decision,
        alert: false,
        body: approval_resolved_body,
        link: approval_link,
    },
    // ── notifications: always alert ─────────────────────────────────
    Rule {
        event_type: "notification",
        title: "Notification",
        title_from_data: true,
        severity: SeverityRule::FromData(Severity::Info),
        alert: true,
        body: notification_body,
        link: data_link,
    },
    Rule {
        event_type: "system_alert",
        title: "System Alert",
        title_from_data: true,
        severity: SeverityRule::FromData(Severity::Warning),
        alert: true,
        body: system_alert_body,
        link: data_link,
    },
    // ── alerts: always alert ────────────────────────────────────────
    Rule {
        event_type: "alert_created",
        title: "New Alert",
        title_from_data: true,
        severity: SeverityRule::AlertLevel,
        alert: true,
        body: alert_created_body,
        link: alert_link,
    },
    Rule {
        event_type: "detection_hit",
        title: "Detection Hit",
        title_from_data: false,
        severity: SeverityRule::Fixed(Severity::Warning),
        alert: true,
        body: detection_hit_body,
        link: alert_link,
    },
];

/// Whether any rule exists for this type.
pub fn is_mapped(event_type: &str) -> bool {
    rule_for(event_type).is_some()
}

fn rule_for(event_type: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.event_type == event_type)
}

/// Map one event. `None` for types without a rule.
pub fn map_event(event: &InboundEvent) -> Option<Mapped> {
    let rule = rule_for(&event.event_type)?;

    let title = if rule.title_from_data {
        event.data_str("title").unwrap_or(rule.title)
    } else {
        rule.title
    };

    let severity = match rule.severity {
        SeverityRule::Fixed(severity) => severity,
        SeverityRule::FromData(fallback) => event
            .data_str("severity")
            .and_then(Severity::parse)
            .unwrap_or(fallback),
        SeverityRule::AlertLevel => alert_severity(event),
        SeverityRule::Decision => decision_severity(event),
    };

    let id = if event.id.is_empty() {
        NotificationId::new()
    } else {
        NotificationId::from_raw(event.id.as_str())
    };

    let timestamp = if event.timestamp.is_empty() {
        Utc::now().to_rfc3339()
    } else {
        event.timestamp.clone()
    };

    Some(Mapped {
        record: NotificationRecord {
            id,
            title: title.to_string(),
            body: (rule.body)(event),
            severity,
            timestamp,
            read: false,
            link: (rule.link)(event),
        },
        alert: rule.alert,
    })
}

fn alert_severity(event: &InboundEvent) -> Severity {
    match event.data_str("severity").map(str::to_ascii_lowercase).as_deref() {
        Some("critical" | "high") => Severity::Error,
        Some("medium") => Severity::Warning,
        Some("low") => Severity::Info,
        Some(other) => Severity::parse(other).unwrap_or(Severity::Warning),
        None => Severity::Warning,
    }
}

fn decision_severity(event: &InboundEvent) -> Severity {
    let approved = match event.data_str("decision") {
        Some(d) if d.eq_ignore_ascii_case("approved") => Some(true),
        Some(d) if d.eq_ignore_ascii_case("rejected") => Some(false),
        _ => event.data.get("approved").and_then(Value::as_bool),
    };
    match approved {
        Some(true) => Severity::Success,
        Some(false) => Severity::Warning,
        None => Severity::Info,
    }
}

// ── bodies ──────────────────────────────────────────────────────────────────

fn case_label(event: &InboundEvent) -> Option<String> {
    event
        .data_str("title")
        .map(|t| format!("\"{t}\""))
        .or_else(|| event.data_str("case_number").map(|n| format!("Case {n}")))
}

fn case_created_body(event: &InboundEvent) -> String {
    match case_label(event) {
        Some(label) => format!("{label} has been created"),
        None => "A new case has been created".to_string(),
    }
}

fn case_updated_body(event: &InboundEvent) -> String {
    match case_label(event) {
        Some(label) => format!("{label} has been updated"),
        None => "A case has been updated".to_string(),
    }
}

fn case_deleted_body(event: &InboundEvent) -> String {
    match case_label(event) {
        Some(label) => format!("{label} has been deleted"),
        None => "A case has been deleted".to_string(),
    }
}

fn case_assigned_body(event: &InboundEvent) -> String {
    let label = case_label(event).unwrap_or_else(|| "A case".to_string());
    match event.data_str("assignee_name").or_else(|| event.data_str("assignee")) {
        Some(assignee) => format!("{label} has been assigned to {assignee}"),
        None => format!("{label} has been assigned to you"),
    }
}

fn workflow_name(event: &InboundEvent) -> &str {
    event.data_str("workflow_name").unwrap_or("A workflow")
}

fn workflow_started_body(event: &InboundEvent) -> String {
    format!("{} has started", workflow_name(event))
}

fn workflow_completed_body(event: &InboundEvent) -> String {
    format!("{} completed successfully", workflow_name(event))
}

fn workflow_failed_body(event: &InboundEvent) -> String {
    match event.data_str("error") {
        Some(error) => format!("{} failed: {error}", workflow_name(event)),
        None => format!("{} has failed", workflow_name(event)),
    }
}

fn approval_required_body(event: &InboundEvent) -> String {
    match event.data_str("step_name") {
        Some(step) => format!("{} is waiting for approval at \"{step}\"", workflow_name(event)),
        None => format!("{} is waiting for your approval", workflow_name(event)),
    }
}

fn approval_resolved_body(event: &InboundEvent) -> String {
    let name = event.data_str("workflow_name").unwrap_or("the workflow");
    match decision_severity(event) {
        Severity::Success => format!("Approval for {name} was granted"),
        Severity::Warning => format!("Approval for {name} was rejected"),
        _ => format!("Approval for {name} was resolved"),
    }
}

fn notification_body(event: &InboundEvent) -> String {
    event
        .data_str("message")
        .or_else(|| event.data_str("body"))
        .unwrap_or("You have a new notification")
        .to_string()
}

fn system_alert_body(event: &InboundEvent) -> String {
    event
        .data_str("message")
        .or_else(|| event.data_str("body"))
        .unwrap_or("A system alert was raised")
        .to_string()
}

fn alert_created_body(event: &InboundEvent) -> String {
    event
        .data_str("description")
        .or_else(|| event.data_str("message"))
        .unwrap_or("A new alert requires attention")
        .to_string()
}

fn detection_hit_body(event: &InboundEvent) -> String {
    match event.data_str("rule_name") {
        Some(rule) => format!("Detection rule \"{rule}\" matched"),
        None => "A detection rule matched".to_string(),
    }
}

// ── links ───────────────────────────────────────────────────────────────────

fn no_link(_: &InboundEvent) -> Option<String> {
    None
}

fn case_link(event: &InboundEvent) -> Option<String> {
    event.data_str("case_id").map(|id| format!("/cases/{id}"))
}

fn workflow_link(event: &InboundEvent) -> Option<String> {
    event.data_str("workflow_id").map(|id| format!("/workflows/{id}"))
}

fn approval_link(event: &InboundEvent) -> Option<String> {
    event
        .data_str("approval_id")
        .map(|id| format!("/approvals/{id}"))
        .or_else(|| workflow_link(event))
}

fn alert_link(event: &InboundEvent) -> Option<String> {
    event.data_str("alert_id").map(|id| format!("/alerts/{id}"))
}

fn data_link(event: &InboundEvent) -> Option<String> {
    event.data_str("link").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefeed_core::codec;

    fn map(frame: &str) -> Mapped {
        map_event(&codec::decode(frame).unwrap()).unwrap()
    }

    #[test]
    fn workflow_failed_is_error_with_alert() {
        let mapped = map(r#"{"type":"workflow_failed","data":{"workflow_name":"X"}}"#);
        assert_eq!(mapped.record.severity, Severity::Error);
        assert_eq!(mapped.record.title, "Workflow Failed");
        assert_eq!(mapped.record.body, "X has failed");
        assert!(mapped.alert);
        assert!(!mapped.record.read);
    }

    #[test]
    fn case_updated_is_info_without_alert() {
        let mapped = map(r#"{"type":"case_updated","data":{"case_id":"c1"}}"#);
        assert_eq!(mapped.record.severity, Severity::Info);
        assert_eq!(mapped.record.link.as_deref(), Some("/cases/c1"));
        assert_eq!(mapped.record.body, "A case has been updated");
        assert!(!mapped.alert);
    }

    #[test]
    fn alert_policy_per_type() {
        let alerting: Vec<&str> = RULES.iter().filter(|r| r.alert).map(|r| r.event_type).collect();
        assert_eq!(
            alerting,
            vec![
                "workflow_failed",
                "approval_required",
                "notification",
                "system_alert",
                "alert_created",
                "detection_hit",
            ]
        );
    }

    #[test]
    fn case_created_uses_title() {
        let mapped = map(
            r#"{"id":"e1","type":"case_created","data":{"case_id":"c7","title":"Card fraud"},"timestamp":"2026-03-01T10:00:00Z"}"#,
        );
        assert_eq!(mapped.record.title, "New Case Created");
        assert_eq!(mapped.record.body, "\"Card fraud\" has been created");
        assert_eq!(mapped.record.id.as_str(), "e1");
        assert_eq!(mapped.record.timestamp, "2026-03-01T10:00:00Z");
    }

    #[test]
    fn missing_id_and_timestamp_are_filled() {
        let mapped = map(r#"{"type":"case_deleted","data":{}}"#);
        assert!(mapped.record.id.as_str().starts_with("ntf_"));
        assert!(!mapped.record.timestamp.is_empty());
        assert_eq!(mapped.record.severity, Severity::Warning);
        assert_eq!(mapped.record.link, None);
    }

    #[test]
    fn case_assigned_fallbacks() {
        let named = map(r#"{"type":"case_assigned","data":{"case_number":"42","assignee_name":"Ana"}}"#);
        assert_eq!(named.record.body, "Case 42 has been assigned to Ana");
        let bare = map(r#"{"type":"case_assigned","data":{}}"#);
        assert_eq!(bare.record.body, "A case has been assigned to you");
    }

    #[test]
    fn approval_required_alerts_and_links_approval() {
        let mapped = map(
            r#"{"type":"approval_required","data":{"workflow_name":"Refund","approval_id":"ap1","workflow_id":"wf1"}}"#,
        );
        assert_eq!(mapped.record.severity, Severity::Warning);
        assert_eq!(mapped.record.link.as_deref(), Some("/approvals/ap1"));
        assert!(mapped.alert);
    }

    #[test]
    fn approval_resolved_severity_follows_decision() {
        let approved = map(r#"{"type":"approval_resolved","data":{"decision":"approved"}}"#);
        assert_eq!(approved.record.severity, Severity::Success);
        let rejected = map(r#"{"type":"approval_resolved","data":{"approved":false}}"#);
        assert_eq!(rejected.record.severity, Severity::Warning);
        assert_eq!(rejected.record.body, "Approval for the workflow was rejected");
        let unknown = map(r#"{"type":"approval_resolved","data":{}}"#);
        assert_eq!(unknown.record.severity, Severity::Info);
        assert!(!unknown.alert);
    }

    #[test]
    fn notification_takes_fields_from_data() {
        let mapped = map(
            r#"{"type":"notification","data":{"title":"Export ready","message":"Your report is ready","severity":"success","link":"/reports/9"}}"#,
        );
        assert_eq!(mapped.record.title, "Export ready");
        assert_eq!(mapped.record.body, "Your report is ready");
        assert_eq!(mapped.record.severity, Severity::Success);
        assert_eq!(mapped.record.link.as_deref(), Some("/reports/9"));
        assert!(mapped.alert);
    }

    #[test]
    fn notification_fallbacks() {
        let mapped = map(r#"{"type":"notification","data":{"severity":"bogus"}}"#);
        assert_eq!(mapped.record.title, "Notification");
        assert_eq!(mapped.record.body, "You have a new notification");
        assert_eq!(mapped.record.severity, Severity::Info);
    }

    #[test]
    fn system_alert_defaults_to_warning() {
        let mapped = map(r#"{"type":"system_alert","data":{"message":"Maintenance at 22:00"}}"#);
        assert_eq!(mapped.record.title, "System Alert");
        assert_eq!(mapped.record.severity, Severity::Warning);
        assert!(mapped.alert);
    }

    #[test]
    fn alert_levels_map_to_severity() {
        for (level, expected) in [
            ("critical", Severity::Error),
            ("HIGH", Severity::Error),
            ("medium", Severity::Warning),
            ("low", Severity::Info),
            ("info", Severity::Info),
            ("whatever", Severity::Warning),
        ] {
            let frame = format!(r#"{{"type":"alert_created","data":{{"severity":"{level}","alert_id":"a1"}}}}"#);
            let mapped = map(&frame);
            assert_eq!(mapped.record.severity, expected, "level {level}");
            assert_eq!(mapped.record.link.as_deref(), Some("/alerts/a1"));
        }
    }

    #[test]
    fn detection_hit_body() {
        let mapped = map(r#"{"type":"detection_hit","data":{"rule_name":"Velocity"}}"#);
        assert_eq!(mapped.record.body, "Detection rule \"Velocity\" matched");
        assert!(mapped.alert);
    }

    #[test]
    fn unmapped_type_is_none() {
        let event = codec::decode(r#"{"type":"user_login","data":{}}"#).unwrap();
        assert!(map_event(&event).is_none());
        assert!(!is_mapped("user_login"));
        assert!(is_mapped("detection_hit"));
    }
}
