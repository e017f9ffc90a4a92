//! Normalization of upstream agent payloads.
//!
//! Agents emit several JSON shapes for the same information. Each shape has
//! its own decoder; decoders run in a fixed order and the first match wins.
//! Everything that reaches the transcript is one of the four [`StreamEvent`]
//! kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Task state that is reported as an error rather than a status update.
pub const TASK_STATE_FAILED: &str = "TASK_STATE_FAILED";

/// Canonical event consumed by the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text delta to append to the streaming answer
    MessageChunk { content: String },
    /// Task status, usually carrying the accumulated answer so far
    StatusUpdate { data: Value },
    /// A backend action the agent performed
    ToolCall { data: Value },
    Error { content: String },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::MessageChunk { .. } => "message_chunk",
            StreamEvent::StatusUpdate { .. } => "status_update",
            StreamEvent::ToolCall { .. } => "tool_call",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Text carried by a status update, if any.
    ///
    /// Looks in `data.status.message.parts` first, then `data.message.parts`,
    /// and returns the first part that has non-empty text.
    pub fn status_text(&self) -> Option<&str> {
        let StreamEvent::StatusUpdate { data } = self else {
            return None;
        };

        let message = truthy(data.get("status").and_then(|s| s.get("message")))
            .or_else(|| truthy(data.get("message")))?;

        message
            .get("parts")?
            .as_array()?
            .iter()
            .find_map(|part| part.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()))
    }
}

/// Result of running the decoders over one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(StreamEvent),
    /// A known shape that carries nothing to show, e.g. an empty delta
    Empty,
    /// No decoder recognised the payload
    Unknown(Value),
}

/// Parse and classify one raw SSE payload.
pub fn normalize(payload: &str) -> Result<Decoded, serde_json::Error> {
    let value: Value = serde_json::from_str(payload)?;
    Ok(classify(&value))
}

/// Classify an already-parsed payload.
pub fn classify(value: &Value) -> Decoded {
    const DECODERS: [fn(&Value) -> Option<Decoded>; 3] =
        [decode_status_shape, decode_delta_shape, decode_typed_shape];

    DECODERS
        .iter()
        .find_map(|decode| decode(value))
        .unwrap_or_else(|| Decoded::Unknown(value.clone()))
}

/// `{statusUpdate: {status: {...}}}` or `{status: {...}}`
fn decode_status_shape(value: &Value) -> Option<Decoded> {
    let status_update = truthy(value.get("statusUpdate"));
    if status_update.is_none() && truthy(value.get("status")).is_none() {
        return None;
    }

    let status_data = status_update.unwrap_or(value);
    let status = truthy(status_data.get("status")).unwrap_or(status_data);

    if status.get("state").and_then(Value::as_str) == Some(TASK_STATE_FAILED) {
        return Some(Decoded::Event(StreamEvent::Error {
            content: failure_text(status),
        }));
    }

    Some(Decoded::Event(StreamEvent::StatusUpdate {
        data: status_data.clone(),
    }))
}

/// `{messageDelta: {content: [{text}]}}` or `{delta: {text}}`
fn decode_delta_shape(value: &Value) -> Option<Decoded> {
    let message_delta = truthy(value.get("messageDelta"));
    let delta = truthy(value.get("delta"));
    if message_delta.is_none() && delta.is_none() {
        return None;
    }

    let text = message_delta
        .and_then(|md| md.get("content"))
        .and_then(|c| c.get(0))
        .and_then(|part| non_empty_str(part.get("text")))
        .or_else(|| delta.and_then(|d| non_empty_str(d.get("text"))));

    Some(match text {
        Some(text) => Decoded::Event(StreamEvent::MessageChunk {
            content: text.to_string(),
        }),
        None => Decoded::Empty,
    })
}

/// `{type: "..."}`
fn decode_typed_shape(value: &Value) -> Option<Decoded> {
    let event_type = value.get("type").and_then(Value::as_str)?;

    let event = match event_type {
        "token" | "content_block_delta" => StreamEvent::MessageChunk {
            content: non_empty_str(value.get("delta").and_then(|d| d.get("text")))
                .or_else(|| non_empty_str(value.get("text")))
                .unwrap_or_default()
                .to_string(),
        },
        "status_update" | "task_status" => StreamEvent::StatusUpdate {
            data: value.get("status").cloned().unwrap_or(Value::Null),
        },
        "tool_call" => StreamEvent::ToolCall { data: value.clone() },
        "error" => StreamEvent::Error {
            content: non_empty_str(value.get("message"))
                .or_else(|| non_empty_str(value.get("content")))
                .unwrap_or("Agent reported an error")
                .to_string(),
        },
        _ => return None,
    };

    Some(Decoded::Event(event))
}

fn failure_text(status: &Value) -> String {
    let message = status.get("message");
    message
        .and_then(|m| m.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|part| non_empty_str(part.get("text")))
        .map(str::to_string)
        .unwrap_or_else(|| match message {
            Some(m) => m.to_string(),
            None => "Task failed".to_string(),
        })
}

/// Filter out values that would not count as present upstream: null, false,
/// zero and the empty string.
fn truthy(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Counters for one stream, logged when it completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames: usize,
    pub events: usize,
    /// Payloads that were not valid JSON or matched no known shape
    pub dropped: usize,
}

impl StreamStats {
    /// Decode one payload, updating the counters, and return the event to forward.
    pub fn record(&mut self, payload: &str) -> Option<StreamEvent> {
        self.frames += 1;
        match normalize(payload) {
            Ok(Decoded::Event(event)) => {
                self.events += 1;
                Some(event)
            }
            Ok(Decoded::Empty) => None,
            Ok(Decoded::Unknown(value)) => {
                self.dropped += 1;
                warn!("Dropping unrecognised agent event: {}", value);
                None
            }
            Err(e) => {
                self.dropped += 1;
                warn!("Failed to parse SSE data chunk: {} - Data: {}", e, payload);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(payload: Value) -> StreamEvent {
        match classify(&payload) {
            Decoded::Event(event) => event,
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[test]
    fn test_status_update_wrapped() {
        let payload = json!({
            "statusUpdate": {
                "taskId": "t-1",
                "status": {
                    "state": "TASK_STATE_WORKING",
                    "message": {"parts": [{"text": "Hello"}]}
                }
            }
        });

        let ev = event(payload);
        assert_eq!(ev.kind(), "status_update");
        assert_eq!(ev.status_text(), Some("Hello"));
    }

    #[test]
    fn test_bare_status_update() {
        let payload = json!({
            "status": {"state": "TASK_STATE_WORKING", "message": {"parts": [{"text": "Working"}]}}
        });

        let ev = event(payload.clone());
        assert_eq!(ev, StreamEvent::StatusUpdate { data: payload });
        assert_eq!(ev.status_text(), Some("Working"));
    }

    #[test]
    fn test_status_text_skips_parts_without_text() {
        let ev = StreamEvent::StatusUpdate {
            data: json!({"message": {"parts": [{"data": {"x": 1}}, {"text": ""}, {"text": "second"}]}}),
        };
        assert_eq!(ev.status_text(), Some("second"));
    }

    #[test]
    fn test_failed_task_becomes_error() {
        let payload = json!({
            "statusUpdate": {
                "status": {
                    "state": "TASK_STATE_FAILED",
                    "message": {"parts": [{"text": "Device not found"}]}
                }
            }
        });

        assert_eq!(
            event(payload),
            StreamEvent::Error {
                content: "Device not found".to_string()
            }
        );
    }

    #[test]
    fn test_failed_task_without_text_uses_message_json() {
        let payload = json!({"status": {"state": "TASK_STATE_FAILED", "message": {"code": 7}}});
        assert_eq!(
            event(payload),
            StreamEvent::Error {
                content: r#"{"code":7}"#.to_string()
            }
        );
    }

    #[test]
    fn test_message_delta_shape() {
        let payload = json!({"messageDelta": {"content": [{"text": "Hel"}]}});
        assert_eq!(
            event(payload),
            StreamEvent::MessageChunk {
                content: "Hel".to_string()
            }
        );
    }

    #[test]
    fn test_legacy_delta_shape() {
        let payload = json!({"delta": {"text": "lo"}});
        assert_eq!(
            event(payload),
            StreamEvent::MessageChunk {
                content: "lo".to_string()
            }
        );
    }

    #[test]
    fn test_empty_delta_is_dropped_quietly() {
        assert_eq!(classify(&json!({"delta": {"text": ""}})), Decoded::Empty);
    }

    #[test]
    fn test_typed_token() {
        assert_eq!(
            event(json!({"type": "token", "text": "abc"})),
            StreamEvent::MessageChunk {
                content: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_typed_status() {
        let ev = event(json!({"type": "task_status", "status": {"state": "TASK_STATE_WORKING"}}));
        assert_eq!(
            ev,
            StreamEvent::StatusUpdate {
                data: json!({"state": "TASK_STATE_WORKING"})
            }
        );
    }

    #[test]
    fn test_typed_tool_call_keeps_whole_payload() {
        let payload = json!({
            "type": "tool_call",
            "tool_name": "create_ticket",
            "parameters": {"title": "VPN down"},
            "result": null,
            "duration": 0
        });

        assert_eq!(event(payload.clone()), StreamEvent::ToolCall { data: payload });
    }

    #[test]
    fn test_unknown_shape() {
        let payload = json!({"heartbeat": true});
        assert_eq!(classify(&payload), Decoded::Unknown(payload));
        assert!(matches!(classify(&json!([1, 2])), Decoded::Unknown(_)));
    }

    #[test]
    fn test_status_shape_wins_over_type() {
        // First matching decoder wins
        let payload = json!({"type": "token", "status": {"state": "TASK_STATE_WORKING"}});
        assert_eq!(event(payload).kind(), "status_update");
    }

    #[test]
    fn test_stats_count_malformed_and_unknown() {
        let mut stats = StreamStats::default();

        assert!(stats.record("{not json").is_none());
        assert!(stats.record(r#"{"ping":1}"#).is_none());
        assert!(stats.record(r#"{"delta":{"text":"x"}}"#).is_some());

        assert_eq!(
            stats,
            StreamStats {
                frames: 3,
                events: 1,
                dropped: 2
            }
        );
    }
}
