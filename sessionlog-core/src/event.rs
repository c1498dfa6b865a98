// Copyright 2025 Sessionlog (https://github.com/sessionlog)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Event model for the append-only conversation log.
//!
//! Each host notification becomes one [`EventRecord`], serialized as a single
//! JSON line:
//!
//! ```json
//! {"kind":"user_turn","payload":{"text":"..."},"timestamp":"...","session_id":"...","agent_session_number":1}
//! ```
//!
//! The payload is an exhaustive tagged union, so an unhandled kind at the
//! ingestion boundary is a compile error rather than a silently dropped
//! string key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant of an event, used for filters and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    UserTurn,
    AssistantTurn,
    ToolInvocationStart,
    ToolInvocationEnd,
    SubAgentCompleted,
    ContextReset,
    Notification,
    PermissionRequested,
}

impl EventKind {
    /// Stable snake_case name, matching the on-disk `kind` field.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionStart => "session_start",
            EventKind::SessionEnd => "session_end",
            EventKind::UserTurn => "user_turn",
            EventKind::AssistantTurn => "assistant_turn",
            EventKind::ToolInvocationStart => "tool_invocation_start",
            EventKind::ToolInvocationEnd => "tool_invocation_end",
            EventKind::SubAgentCompleted => "sub_agent_completed",
            EventKind::ContextReset => "context_reset",
            EventKind::Notification => "notification",
            EventKind::PermissionRequested => "permission_requested",
        }
    }

    /// All kinds, in on-disk name order of declaration.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::SessionStart,
            EventKind::SessionEnd,
            EventKind::UserTurn,
            EventKind::AssistantTurn,
            EventKind::ToolInvocationStart,
            EventKind::ToolInvocationEnd,
            EventKind::SubAgentCompleted,
            EventKind::ContextReset,
            EventKind::Notification,
            EventKind::PermissionRequested,
        ]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown event kind: {s}"))
    }
}

/// A typed event as delivered by the host, before log metadata is attached.
///
/// Adjacently tagged so that `kind` and `payload` serialize as the two
/// separate fields of the record contract. Marker events carry an empty
/// payload object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Event {
    SessionStart {},
    SessionEnd {},
    UserTurn {
        text: String,
    },
    AssistantTurn {
        text: String,
    },
    ToolInvocationStart {
        tool_name: String,
        tool_input: serde_json::Value,
    },
    ToolInvocationEnd {
        tool_name: String,
        result: serde_json::Value,
    },
    SubAgentCompleted {
        agent_id: String,
        model: String,
        tools_used: Vec<String>,
        response: String,
    },
    ContextReset {},
    Notification {
        text: String,
    },
    PermissionRequested {
        kind: String,
    },
}

impl Event {
    /// The discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SessionStart {} => EventKind::SessionStart,
            Event::SessionEnd {} => EventKind::SessionEnd,
            Event::UserTurn { .. } => EventKind::UserTurn,
            Event::AssistantTurn { .. } => EventKind::AssistantTurn,
            Event::ToolInvocationStart { .. } => EventKind::ToolInvocationStart,
            Event::ToolInvocationEnd { .. } => EventKind::ToolInvocationEnd,
            Event::SubAgentCompleted { .. } => EventKind::SubAgentCompleted,
            Event::ContextReset {} => EventKind::ContextReset,
            Event::Notification { .. } => EventKind::Notification,
            Event::PermissionRequested { .. } => EventKind::PermissionRequested,
        }
    }

    /// The primary free-text field, for summarization fingerprints.
    ///
    /// Tool invocations and marker events have no primary text; their
    /// searchable content is derived separately (see [`Event::search_text`]).
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            Event::UserTurn { text }
            | Event::AssistantTurn { text }
            | Event::Notification { text } => Some(text),
            Event::SubAgentCompleted { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Text content indexed for search.
    ///
    /// Tool invocations contribute their tool name plus compact JSON of the
    /// input/result; marker events contribute nothing.
    pub fn search_text(&self) -> String {
        match self {
            Event::UserTurn { text }
            | Event::AssistantTurn { text }
            | Event::Notification { text } => text.clone(),
            Event::SubAgentCompleted {
                agent_id,
                model,
                tools_used,
                response,
            } => {
                format!("{agent_id} {model} {} {response}", tools_used.join(" "))
            }
            Event::ToolInvocationStart {
                tool_name,
                tool_input,
            } => format!("{tool_name} {tool_input}"),
            Event::ToolInvocationEnd { tool_name, result } => {
                format!("{tool_name} {result}")
            }
            Event::PermissionRequested { kind } => kind.clone(),
            Event::SessionStart {} | Event::SessionEnd {} | Event::ContextReset {} => {
                String::new()
            }
        }
    }
}

/// One line of the append-only log: an [`Event`] plus log metadata.
///
/// Once written a record is never mutated or deleted; within one session
/// file the timestamps are monotonic non-decreasing under single-writer
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: Event,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub agent_session_number: u32,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_record_line_shape() {
        let record = EventRecord {
            event: Event::UserTurn {
                text: "fix auth bug".to_string(),
            },
            timestamp: ts(),
            session_id: "abc123".to_string(),
            agent_session_number: 1,
        };

        let line = serde_json::to_string(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["kind"], "user_turn");
        assert_eq!(value["payload"]["text"], "fix auth bug");
        assert_eq!(value["session_id"], "abc123");
        assert_eq!(value["agent_session_number"], 1);

        let back: EventRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_marker_event_empty_payload() {
        let record = EventRecord {
            event: Event::ContextReset {},
            timestamp: ts(),
            session_id: "abc123".to_string(),
            agent_session_number: 2,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "context_reset");
        assert_eq!(value["payload"], serde_json::json!({}));
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in EventKind::all() {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), *kind);
        }
        assert!("spurious".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_primary_text() {
        let event = Event::AssistantTurn {
            text: "done".to_string(),
        };
        assert_eq!(event.primary_text(), Some("done"));
        assert_eq!(Event::SessionStart {}.primary_text(), None);

        let sub = Event::SubAgentCompleted {
            agent_id: "explorer".to_string(),
            model: "small-1".to_string(),
            tools_used: vec!["read".to_string()],
            response: "found it".to_string(),
        };
        assert_eq!(sub.primary_text(), Some("found it"));
    }

    #[test]
    fn test_search_text_for_tools() {
        let event = Event::ToolInvocationStart {
            tool_name: "grep".to_string(),
            tool_input: serde_json::json!({"pattern": "auth"}),
        };
        let text = event.search_text();
        assert!(text.contains("grep"));
        assert!(text.contains("auth"));
    }
}
