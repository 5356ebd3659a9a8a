//! Dashboard events recorded in the JSONL event log.
//!
//! One line per event: every tab load, assistant answer, draft decision,
//! chart bind, escalation and spoken utterance.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::ErrorCategory;
use crate::normalize::DataSource;

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A tab payload finished loading, from the backend or the fallback set.
    TabLoad {
        tab: String,
        source: DataSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<ErrorCategory>,
        latency_ms: u64,
        /// Whether the payload reached the active context.
        #[serde(default)]
        applied: bool,
    },
    /// The assistant answered a question.
    Answer {
        tab: String,
        /// `"backend"` or `"local"`.
        source: String,
        /// Local responder category, when answered locally.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default)]
        voice: bool,
    },
    DraftDecision {
        draft_id: String,
        /// `"sent"`, `"rejected"`, `"cancelled"` or `"failed"`.
        decision: String,
        #[serde(default)]
        recipients: usize,
    },
    ChartBind {
        canvas: String,
        kind: String,
    },
    Escalation {
        email_id: String,
        subject: String,
        notes: String,
    },
    Utterance {
        text: String,
        remote: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TabLoad { .. } => "tab_load",
            Self::Answer { .. } => "answer",
            Self::DraftDecision { .. } => "draft_decision",
            Self::ChartBind { .. } => "chart_bind",
            Self::Escalation { .. } => "escalation",
            Self::Utterance { .. } => "utterance",
        }
    }
}

/// A timestamped event, as stored on one log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: String,
    #[serde(flatten)]
    pub event: Event,
}

impl EventEntry {
    pub fn now(event: Event) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_flat_with_event_tag() {
        let entry = EventEntry {
            timestamp: "2026-01-01T00:00:00+00:00".into(),
            event: Event::ChartBind {
                canvas: "labTatChart".into(),
                kind: "progress-ring".into(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"], "chart_bind");
        assert_eq!(json["canvas"], "labTatChart");
        assert_eq!(json["timestamp"], "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn tab_load_round_trips_through_json_line() {
        let entry = EventEntry::now(Event::TabLoad {
            tab: "orders".into(),
            source: DataSource::Fallback,
            category: Some(ErrorCategory::Transport),
            latency_ms: 12,
            applied: false,
        });
        let line = serde_json::to_string(&entry).unwrap();
        let back: EventEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.event.name(), "tab_load");
    }
}
