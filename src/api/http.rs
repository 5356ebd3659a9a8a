/// HTTP implementation of [`Backend`] over the synchronous `ureq` client.
///
/// One client is built from the resolved config at startup and shared by the
/// runtime's fetch workers. Each call maps every failure onto a
/// [`FetchError`] variant so callers can decide between fallback data and a
/// user-visible error.
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{
    AskReply, AskRequest, Backend, Draft, Envelope, FetchError, RawCalendarEvent, RawEmail,
    SendEmailRequest,
};
use crate::config::schema::{ApiConfig, Endpoints};

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    endpoints: Endpoints,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct EmailList {
    #[serde(default)]
    emails: Vec<RawEmail>,
}

#[derive(Debug, Deserialize)]
struct InboxSummary {
    #[serde(default)]
    drafts: Vec<Draft>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<RawCalendarEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct SendReply {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl HttpBackend {
    /// Build a client from the `[api]` config section.
    ///
    /// `localhost` is rewritten to `127.0.0.1` so a backend bound only to
    /// IPv4 does not stall on an IPv6 attempt first.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config
                .base_url
                .trim_end_matches('/')
                .replace("://localhost", "://127.0.0.1"),
            endpoints: config.endpoints.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request and decode the JSON body.
    fn json(&self, request: ureq::Request, body: Option<Value>) -> Result<Value, FetchError> {
        let url = request.url().to_string();
        let started = std::time::Instant::now();
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                let detail = resp
                    .into_string()
                    .ok()
                    .and_then(|text| serde_json::from_str::<Value>(&text).ok())
                    .and_then(|v| v.get("detail").and_then(Value::as_str).map(String::from));
                return Err(FetchError::Status { status, detail });
            }
            Err(ureq::Error::Transport(t)) => return Err(FetchError::Transport(t.to_string())),
        };

        let content_type = response.content_type().to_string();
        if !content_type.contains("json") {
            return Err(FetchError::NotJson { content_type });
        }

        let text = response
            .into_string()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        debug!(%url, elapsed_ms = started.elapsed().as_millis() as u64, bytes = text.len(), "backend response");
        serde_json::from_str(&text).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    fn get(&self, path: &str) -> ureq::Request {
        ureq::get(&self.url(path)).timeout(self.timeout)
    }

    fn post(&self, path: &str) -> ureq::Request {
        ureq::post(&self.url(path)).timeout(self.timeout)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

impl Backend for HttpBackend {
    fn overview(&self) -> Result<Value, FetchError> {
        self.json(self.get(&self.endpoints.overview), None)
    }

    fn stock(&self) -> Result<Value, FetchError> {
        self.json(self.get(&self.endpoints.stock), None)
    }

    fn ask_tab(&self, request: &AskRequest<'_>) -> Result<AskReply, FetchError> {
        let body = serde_json::to_value(request).map_err(|e| FetchError::Malformed(e.to_string()))?;
        let reply: AskReply = decode(self.json(self.post(&self.endpoints.ask_tab), Some(body))?)?;
        if !reply.success && reply.answer.is_none() {
            return Err(FetchError::Unsuccessful(reply.error));
        }
        Ok(reply)
    }

    fn emails(&self, max_results: usize, query: Option<&str>) -> Result<Vec<RawEmail>, FetchError> {
        let mut request = self
            .get(&self.endpoints.emails)
            .query("max_results", &max_results.to_string());
        if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            request = request.query("query", q);
        }
        let list: EmailList = decode(self.json(request, None)?)?;
        Ok(list.emails)
    }

    fn drafts(&self) -> Result<Vec<Draft>, FetchError> {
        let summary: InboxSummary = decode(self.json(self.get(&self.endpoints.inbox_summary), None)?)?;
        Ok(summary.drafts)
    }

    fn send_email(&self, request: &SendEmailRequest) -> Result<(), FetchError> {
        let body = serde_json::to_value(request).map_err(|e| FetchError::Malformed(e.to_string()))?;
        let reply: SendReply = decode(self.json(self.post(&self.endpoints.send_email), Some(body))?)?;
        if reply.success {
            Ok(())
        } else {
            Err(FetchError::Unsuccessful(reply.detail.or(reply.error)))
        }
    }

    fn calendar_events(&self, timeframe: &str) -> Result<Vec<RawCalendarEvent>, FetchError> {
        let request = self
            .get(&self.endpoints.calendar_events)
            .query("timeframe", timeframe);
        let list: EventList = decode(self.json(request, None)?)?;
        Ok(list.events)
    }
}

/// Unwrap a `{success, data}` envelope returned by a dashboard endpoint.
pub fn envelope_data(raw: Value) -> Result<Value, FetchError> {
    let envelope: Envelope = decode(raw)?;
    envelope.into_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_is_normalized() {
        let config = ApiConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..ApiConfig::default()
        };
        let backend = HttpBackend::from_config(&config);
        assert_eq!(
            backend.url("/api/dashboard/overview"),
            "http://127.0.0.1:8000/api/dashboard/overview"
        );
    }

    #[test]
    fn envelope_data_unwraps_success() {
        let data = envelope_data(json!({"success": true, "data": {"a": 1}})).unwrap();
        assert_eq!(data["a"], 1);
    }

    #[test]
    fn envelope_data_rejects_failure() {
        let err = envelope_data(json!({"success": false, "error": "db down"})).unwrap_err();
        assert_eq!(err.detail(), Some("db down"));
    }

    #[test]
    fn envelope_data_rejects_non_object() {
        let err = envelope_data(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn unreachable_backend_is_transport_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..ApiConfig::default()
        };
        let err = HttpBackend::from_config(&config).overview().unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
