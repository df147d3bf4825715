//! JSON wire codec.
//!
//! Outbound: `{"action": "subscribe"|"unsubscribe"|"ping", "topic"?: string}`.
//! Inbound:  `{"id": string, "type": string, "data": object, "timestamp": string}`.

use serde_json::Value;

use crate::errors::{CodecError, DecodeError};
use crate::frames::{ControlFrame, InboundEvent};

pub fn encode(frame: &ControlFrame) -> Result<String, CodecError> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode one text frame. Two-step so that garbage and well-formed JSON of the
/// wrong shape are reported differently.
pub fn decode(text: &str) -> Result<InboundEvent, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;
    serde_json::from_value(value).map_err(DecodeError::InvalidShape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Topic;

    #[test]
    fn encode_subscribe() {
        let json = encode(&ControlFrame::subscribe(Topic::from("cases"))).unwrap();
        assert_eq!(json, r#"{"action":"subscribe","topic":"cases"}"#);
    }

    #[test]
    fn encode_unsubscribe() {
        let json = encode(&ControlFrame::unsubscribe(Topic::from("alerts"))).unwrap();
        assert_eq!(json, r#"{"action":"unsubscribe","topic":"alerts"}"#);
    }

    #[test]
    fn encode_ping_omits_topic() {
        let json = encode(&ControlFrame::ping()).unwrap();
        assert_eq!(json, r#"{"action":"ping"}"#);
    }

    #[test]
    fn decode_full_event() {
        let event = decode(
            r#"{"id":"evt-1","type":"case_created","data":{"case_id":"c1","title":"Fraud"},"timestamp":"2026-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.event_type, "case_created");
        assert_eq!(event.data_str("title"), Some("Fraud"));
        assert_eq!(event.timestamp, "2026-03-01T10:00:00Z");
    }

    #[test]
    fn decode_tolerates_missing_optional_fields() {
        let event = decode(r#"{"type":"workflow_failed","data":{"workflow_name":"X"}}"#).unwrap();
        assert!(event.id.is_empty());
        assert!(event.timestamp.is_empty());
        assert_eq!(event.data_str("workflow_name"), Some("X"));
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode("definitely not json").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        assert!(matches!(decode("[1,2,3]").unwrap_err(), DecodeError::InvalidShape(_)));
        assert!(matches!(
            decode(r#"{"id":"x","data":{}}"#).unwrap_err(),
            DecodeError::InvalidShape(_)
        ));
        assert!(matches!(
            decode(r#"{"type":"notification","data":"text"}"#).unwrap_err(),
            DecodeError::InvalidShape(_)
        ));
    }
}
