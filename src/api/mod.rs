//! Backend API boundary.
//!
//! The dashboard talks to a single HTTP backend. Everything above this module
//! sees it only through the [`Backend`] trait, so the controller, normalizer
//! and assistant can be driven by an in-memory fake in tests.

pub mod http;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use http::HttpBackend;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Why a backend call did not produce usable data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never completed (connection refused, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-2xx status.
    #[error("backend returned HTTP {status}")]
    Status { status: u16, detail: Option<String> },
    /// The server answered 2xx but flagged the call as unsuccessful.
    #[error("backend reported failure{}", .0.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unsuccessful(Option<String>),
    /// The body was not JSON.
    #[error("response was not JSON ({content_type})")]
    NotJson { content_type: String },
    /// The JSON was well formed but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Coarse failure class used for fallback decisions and the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Transport,
    Unsuccessful,
    NotJson,
    Malformed,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Unsuccessful => write!(f, "unsuccessful"),
            Self::NotJson => write!(f, "not_json"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Status { .. } | Self::Unsuccessful(_) => ErrorCategory::Unsuccessful,
            Self::NotJson { .. } => ErrorCategory::NotJson,
            Self::Malformed(_) => ErrorCategory::Malformed,
        }
    }

    /// Server-provided explanation, when there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            Self::Unsuccessful(detail) => detail.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `{success, data}` envelope used by the dashboard endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Unwrap `data`, turning `success != true` into [`FetchError::Unsuccessful`].
    pub fn into_data(self) -> Result<Value, FetchError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(FetchError::Unsuccessful(self.error))
        }
    }
}

/// Body of `POST /api/query/ask-tab`.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
    pub tab: &'a str,
    pub tab_data: &'a Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub voice_mode: bool,
}

/// Reply from the question-answering endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub tab_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// An inbox message as returned by the mail endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEmail {
    pub id: String,
    pub from: String,
    pub subject: String,
    #[serde(alias = "snippet")]
    pub preview: String,
    pub date: String,
    pub unread: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// An AI-composed reply awaiting approval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Draft {
    pub id: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Body of `POST /voice-agent/email/send`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendEmailRequest {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub thread_id: String,
}

/// A calendar entry. Older backends send `summary` and `start_time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCalendarEvent {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub start: Option<String>,
    pub start_time: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Every remote operation the dashboard performs.
///
/// Implementations must be shareable across the worker threads the runtime
/// uses for fetches.
pub trait Backend: Send + Sync {
    /// `GET overview` → raw `{success, data}` JSON.
    fn overview(&self) -> Result<Value, FetchError>;
    /// `GET tiles/stock` → raw `{success, data}` JSON.
    fn stock(&self) -> Result<Value, FetchError>;
    /// `POST ask-tab`.
    fn ask_tab(&self, request: &AskRequest<'_>) -> Result<AskReply, FetchError>;
    /// `GET emails?max_results=&query=`.
    fn emails(&self, max_results: usize, query: Option<&str>) -> Result<Vec<RawEmail>, FetchError>;
    /// `GET inbox/summary` → pending drafts.
    fn drafts(&self) -> Result<Vec<Draft>, FetchError>;
    /// `POST email/send`.
    fn send_email(&self, request: &SendEmailRequest) -> Result<(), FetchError>;
    /// `GET calendar/events?timeframe=`.
    fn calendar_events(&self, timeframe: &str) -> Result<Vec<RawCalendarEvent>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn categories_follow_failure_class() {
        assert_eq!(
            FetchError::Transport("refused".into()).category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            FetchError::Status {
                status: 502,
                detail: None
            }
            .category(),
            ErrorCategory::Unsuccessful
        );
        assert_eq!(
            FetchError::NotJson {
                content_type: "text/html".into()
            }
            .category(),
            ErrorCategory::NotJson
        );
    }

    #[test]
    fn envelope_without_success_is_unsuccessful() {
        let env: Envelope = serde_json::from_value(json!({"data": {"x": 1}})).unwrap();
        let err = env.into_data().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unsuccessful);
    }

    #[test]
    fn unsuccessful_message_includes_detail() {
        let err = FetchError::Unsuccessful(Some("quota exceeded".into()));
        assert_eq!(err.to_string(), "backend reported failure: quota exceeded");
        assert_eq!(FetchError::Unsuccessful(None).to_string(), "backend reported failure");
    }

    #[test]
    fn ask_request_omits_voice_flag_when_off() {
        let data = json!({"monthly_orders": 1});
        let body = serde_json::to_value(AskRequest {
            question: "q",
            tab: "orders",
            tab_data: &data,
            voice_mode: false,
        })
        .unwrap();
        assert!(body.get("voice_mode").is_none());
        assert_eq!(body["tab"], "orders");
    }

    #[test]
    fn raw_email_accepts_snippet_alias() {
        let email: RawEmail =
            serde_json::from_value(json!({"id": "1", "snippet": "hi there"})).unwrap();
        assert_eq!(email.preview, "hi there");
        assert!(!email.unread);
    }
}
