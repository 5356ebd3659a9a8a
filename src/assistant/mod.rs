//! Context-aware question answering.
//!
//! A question is sent to the backend together with the active tab and its
//! payload. Any failure (transport, non-JSON, unsuccessful reply) falls back
//! to the keyword-matched [`LocalResponder`]. Every answer lands in the
//! [`Transcript`], newest first.

pub mod fallback;
pub mod speech;
pub mod transcript;
pub mod voice;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::analytics::{Event, EventLog};
use crate::api::{AskReply, AskRequest, Backend, ErrorCategory, FetchError};
use crate::tabs::{ActiveContext, TabId};

pub use fallback::{LocalResponder, RotatingPicker, TemplatePicker, Topic};
pub use speech::{AudioSession, LoggingSpeech, SpeechOutput, VoicePrefs};
pub use transcript::{Transcript, TranscriptEntry};
pub use voice::{Recognizer, RecognizerEvent, VoiceAction, VoiceLoop};

const NO_RESPONSE: &str = "No response received";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Backend,
    Local,
}

impl AnswerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Local => "local",
        }
    }
}

// ---------------------------------------------------------------------------
// Questions and answers
// ---------------------------------------------------------------------------

/// A question bound to the context it was asked in. Owned, so it can be
/// handed to a worker thread while the user keeps switching tabs.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    pub tab: TabId,
    pub tab_data: Value,
    pub voice: bool,
}

impl Question {
    pub fn new(text: &str, context: &ActiveContext, voice: bool) -> Self {
        Self {
            text: text.trim().to_string(),
            tab: context.tab,
            tab_data: context
                .payload
                .as_ref()
                .map_or(Value::Null, |payload| payload.to_value()),
            voice,
        }
    }

    pub fn request(&self) -> AskRequest<'_> {
        AskRequest {
            question: &self.text,
            tab: self.tab.as_str(),
            tab_data: &self.tab_data,
            voice_mode: self.voice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    /// Answer text as received, unescaped.
    pub answer: String,
    pub source: AnswerSource,
    pub tab_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Local responder topic, for local answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
    /// Why the backend was not used, for local answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<ErrorCategory>,
    pub voice: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct AssistantRouter<P: TemplatePicker = RotatingPicker> {
    local: LocalResponder<P>,
    transcript: Transcript,
    log: EventLog,
}

impl AssistantRouter<RotatingPicker> {
    pub fn new(log: EventLog) -> Self {
        Self::with_picker(RotatingPicker::default(), log)
    }
}

impl<P: TemplatePicker> AssistantRouter<P> {
    pub fn with_picker(picker: P, log: EventLog) -> Self {
        Self {
            local: LocalResponder::new(picker),
            transcript: Transcript::default(),
            log,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Ask `backend` about the active tab, falling back locally.
    pub fn ask(
        &mut self,
        backend: &dyn Backend,
        question: &str,
        context: &ActiveContext,
    ) -> AnswerResult {
        self.ask_with(backend, question, context, false)
    }

    /// Like [`ask`](Self::ask), with the backend's voice-friendly mode.
    pub fn ask_with(
        &mut self,
        backend: &dyn Backend,
        question: &str,
        context: &ActiveContext,
        voice: bool,
    ) -> AnswerResult {
        let question = Question::new(question, context, voice);
        let reply = backend.ask_tab(&question.request());
        self.resolve(question, reply)
    }

    /// Turn a backend reply, or its failure, into an answer.
    pub fn resolve(
        &mut self,
        question: Question,
        reply: Result<AskReply, FetchError>,
    ) -> AnswerResult {
        let result = match reply {
            Ok(reply) => AnswerResult {
                answer: reply.answer.unwrap_or_else(|| NO_RESPONSE.to_string()),
                source: AnswerSource::Backend,
                tab_label: transcript::tab_label(reply.tab_name.as_deref(), question.tab),
                model: reply.model,
                topic: None,
                fallback_reason: None,
                voice: question.voice,
            },
            Err(err) => {
                warn!(tab = %question.tab, error = %err, "assistant backend unavailable, answering locally");
                let local = self.local.respond(&question.text);
                AnswerResult {
                    answer: local.text.to_string(),
                    source: AnswerSource::Local,
                    tab_label: transcript::tab_label(None, question.tab),
                    model: Some(format!("Local ({})", local.topic.title())),
                    topic: Some(local.topic),
                    fallback_reason: Some(err.category()),
                    voice: question.voice,
                }
            }
        };

        info!(tab = %question.tab, source = result.source.as_str(), "answered");
        self.log.record(Event::Answer {
            tab: question.tab.as_str().to_string(),
            source: result.source.as_str().to_string(),
            category: result.topic.map(|t| t.as_str().to_string()),
            voice: result.voice,
        });

        self.transcript.push(TranscriptEntry {
            question: question.text,
            answer_html: transcript::escape_answer(&result.answer),
            tab_label: result.tab_label.clone(),
            source: result.source,
            model: result.model.clone(),
            voice: result.voice,
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Section, fallback_payload};

    fn context(tab: TabId, with_payload: bool) -> ActiveContext {
        ActiveContext {
            tab,
            payload: with_payload.then(|| fallback_payload(Section::Lab)),
            issue: None,
        }
    }

    #[test]
    fn question_carries_tab_and_payload() {
        let question = Question::new("  how is TAT? ", &context(TabId::Lab, true), false);
        let request = question.request();
        assert_eq!(request.question, "how is TAT?");
        assert_eq!(request.tab, "lab");
        assert!(request.tab_data.get("average_turnaround_hours").is_some());
        assert!(!request.voice_mode);
    }

    #[test]
    fn missing_payload_sends_null() {
        let question = Question::new("hi", &context(TabId::Email, false), true);
        assert_eq!(question.tab_data, Value::Null);
        assert!(question.request().voice_mode);
    }

    #[test]
    fn backend_reply_is_used_verbatim() {
        let mut router = AssistantRouter::new(EventLog::disabled());
        let question = Question::new("q", &context(TabId::Lab, true), false);
        let result = router.resolve(
            question,
            Ok(AskReply {
                success: true,
                answer: Some("<b>fine</b>".into()),
                tab_name: Some("Lab Operations".into()),
                model: Some("m1".into()),
                error: None,
            }),
        );
        assert_eq!(result.source, AnswerSource::Backend);
        assert_eq!(result.answer, "<b>fine</b>");
        assert_eq!(result.tab_label, "Lab Operations");
        let entry = router.transcript().latest().unwrap();
        assert_eq!(entry.answer_html, "&lt;b&gt;fine&lt;/b&gt;");
    }

    #[test]
    fn failure_falls_back_locally() {
        let mut router = AssistantRouter::with_picker(fallback::FirstPicker, EventLog::disabled());
        let question = Question::new("What is our compliance rate?", &context(TabId::Compliance, false), false);
        let result = router.resolve(question, Err(FetchError::NotJson { content_type: "text/html".into() }));
        assert_eq!(result.source, AnswerSource::Local);
        assert_eq!(result.topic, Some(Topic::Compliance));
        assert_eq!(result.fallback_reason, Some(ErrorCategory::NotJson));
        assert_eq!(result.tab_label, "COMPLIANCE");
        assert_eq!(result.model.as_deref(), Some("Local (Compliance)"));
        assert_eq!(result.answer, Topic::Compliance.templates()[0]);
    }

    #[test]
    fn answer_without_text_reads_no_response() {
        let mut router = AssistantRouter::new(EventLog::disabled());
        let question = Question::new("q", &context(TabId::Overview, false), false);
        let result = router.resolve(
            question,
            Ok(AskReply {
                success: true,
                ..AskReply::default()
            }),
        );
        assert_eq!(result.answer, NO_RESPONSE);
    }
}
