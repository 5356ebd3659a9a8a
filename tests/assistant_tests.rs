/// Assistant routing tests.
///
/// Questions go to the backend with the active tab's data; when the backend
/// is unreachable they are answered locally by keyword topic.
use execdash::analytics::EventLog;
use execdash::api::{
    AskReply, AskRequest, Backend, Draft, ErrorCategory, FetchError, RawCalendarEvent, RawEmail,
    SendEmailRequest,
};
use execdash::assistant::fallback::FirstPicker;
use execdash::assistant::{AnswerSource, AssistantRouter, Topic};
use execdash::normalize::{Section, fallback_payload};
use execdash::tabs::{ActiveContext, TabId};
use serde_json::Value;
use std::sync::Mutex;

/// Backend whose only working call is `ask_tab`, answering with `reply`.
struct Asking {
    reply: Option<AskReply>,
    seen: Mutex<Vec<(String, String, Value)>>,
}

impl Asking {
    fn unreachable() -> Self {
        Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn answering(answer: &str, tab_name: Option<&str>) -> Self {
        Self {
            reply: Some(AskReply {
                success: true,
                answer: Some(answer.to_string()),
                tab_name: tab_name.map(str::to_string),
                model: Some("gpt-4o".to_string()),
                error: None,
            }),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Backend for Asking {
    fn overview(&self) -> Result<Value, FetchError> {
        Err(FetchError::Transport("down".into()))
    }
    fn stock(&self) -> Result<Value, FetchError> {
        Err(FetchError::Transport("down".into()))
    }
    fn ask_tab(&self, request: &AskRequest<'_>) -> Result<AskReply, FetchError> {
        self.seen.lock().unwrap().push((
            request.question.to_string(),
            request.tab.to_string(),
            request.tab_data.clone(),
        ));
        self.reply
            .clone()
            .ok_or_else(|| FetchError::Transport("connection refused".into()))
    }
    fn emails(&self, _: usize, _: Option<&str>) -> Result<Vec<RawEmail>, FetchError> {
        Err(FetchError::Transport("down".into()))
    }
    fn drafts(&self) -> Result<Vec<Draft>, FetchError> {
        Err(FetchError::Transport("down".into()))
    }
    fn send_email(&self, _: &SendEmailRequest) -> Result<(), FetchError> {
        Err(FetchError::Transport("down".into()))
    }
    fn calendar_events(&self, _: &str) -> Result<Vec<RawCalendarEvent>, FetchError> {
        Err(FetchError::Transport("down".into()))
    }
}

fn context(tab: TabId, section: Section) -> ActiveContext {
    ActiveContext {
        tab,
        payload: Some(fallback_payload(section)),
        issue: None,
    }
}

// ---------------------------------------------------------------------------
// Local fallback
// ---------------------------------------------------------------------------

#[test]
fn unreachable_backend_answers_meeting_question_generally() {
    let backend = Asking::unreachable();
    let mut router = AssistantRouter::new(EventLog::disabled());
    let result = router.ask(
        &backend,
        "What meetings do I have today?",
        &ActiveContext::default(),
    );

    assert_eq!(result.source, AnswerSource::Local);
    assert_eq!(result.topic, Some(Topic::General));
    assert_eq!(result.fallback_reason, Some(ErrorCategory::Transport));
    assert_eq!(result.model.as_deref(), Some("Local (General)"));
    assert!(Topic::General.templates().contains(&result.answer.as_str()));
}

#[test]
fn local_answers_follow_question_keywords() {
    let backend = Asking::unreachable();
    let mut router = AssistantRouter::with_picker(FirstPicker, EventLog::disabled());
    let ctx = context(TabId::Lab, Section::Lab);

    let lab = router.ask(&backend, "Why is lab turnaround slipping?", &ctx);
    assert_eq!(lab.topic, Some(Topic::Lab));
    assert_eq!(lab.answer, Topic::Lab.templates()[0]);

    let costs = router.ask(&backend, "Where can we cut costs?", &ctx);
    assert_eq!(costs.topic, Some(Topic::Finance));
}

#[test]
fn rotating_picker_cycles_templates() {
    let backend = Asking::unreachable();
    let mut router = AssistantRouter::new(EventLog::disabled());
    let ctx = ActiveContext::default();
    let templates = Topic::Risk.templates();

    let answers: Vec<String> = (0..templates.len() + 1)
        .map(|_| router.ask(&backend, "Any risk alerts?", &ctx).answer)
        .collect();
    for (i, answer) in answers.iter().enumerate() {
        assert_eq!(answer, templates[i % templates.len()]);
    }
}

// ---------------------------------------------------------------------------
// Backend answers
// ---------------------------------------------------------------------------

#[test]
fn backend_receives_active_tab_and_data() {
    let backend = Asking::answering("Orders are up 12%.", Some("Order Volume"));
    let mut router = AssistantRouter::new(EventLog::disabled());
    let ctx = context(TabId::Orders, Section::Orders);

    let result = router.ask(&backend, "  How are orders?  ", &ctx);
    assert_eq!(result.source, AnswerSource::Backend);
    assert_eq!(result.tab_label, "Order Volume");
    assert_eq!(result.model.as_deref(), Some("gpt-4o"));
    assert!(result.topic.is_none());

    let seen = backend.seen.lock().unwrap();
    let (question, tab, data) = &seen[0];
    assert_eq!(question, "How are orders?");
    assert_eq!(tab, "orders");
    assert!(data.get("monthly_orders").is_some());
}

#[test]
fn transcript_keeps_newest_first_and_escapes_html() {
    let backend = Asking::answering("Revenue <b>up</b>\nCosts flat", None);
    let mut router = AssistantRouter::new(EventLog::disabled());
    let ctx = context(TabId::Costs, Section::Costs);

    router.ask(&backend, "first", &ctx);
    router.ask(&backend, "second", &ctx);

    let entries: Vec<_> = router.transcript().entries().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].question, "second");
    assert_eq!(entries[0].tab_label, "COSTS");
    assert_eq!(
        entries[0].answer_html,
        "Revenue &lt;b&gt;up&lt;/b&gt;<br>Costs flat"
    );
}
