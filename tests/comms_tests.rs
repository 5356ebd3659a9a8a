/// Communications panel tests: categorization, search phrases, inbox
/// filtering and the draft approval flow.
use std::sync::Mutex;

use execdash::analytics::EventLog;
use execdash::api::{
    AskReply, AskRequest, Backend, Draft, FetchError, RawCalendarEvent, RawEmail,
    SendEmailRequest,
};
use execdash::comms::{
    CategoryFilter, CommsState, Decision, DraftError, EmailCategory, Timeframe, UserPrompt, categorize,
    gmail_query_for,
};
use serde_json::Value;

/// Inbox backend that records sent mail and can be told to fail sends.
#[derive(Default)]
struct Mailbox {
    fail_send: bool,
    sent: Mutex<Vec<SendEmailRequest>>,
    queries: Mutex<Vec<Option<String>>>,
}

impl Backend for Mailbox {
    fn overview(&self) -> Result<Value, FetchError> {
        Err(FetchError::Transport("unused".into()))
    }
    fn stock(&self) -> Result<Value, FetchError> {
        Err(FetchError::Transport("unused".into()))
    }
    fn ask_tab(&self, _: &AskRequest<'_>) -> Result<AskReply, FetchError> {
        Err(FetchError::Transport("unused".into()))
    }
    fn emails(&self, _: usize, query: Option<&str>) -> Result<Vec<RawEmail>, FetchError> {
        self.queries.lock().unwrap().push(query.map(str::to_string));
        Ok(vec![
            email("1", "URGENT: server down", "", true),
            email("2", "Project kickoff", "meeting at 10", false),
            email("3", "Weekend plans", "family dinner", true),
            email("4", "50% off everything", "limited offer", false),
            email("5", "Hello", "just checking in", false),
        ])
    }
    fn drafts(&self) -> Result<Vec<Draft>, FetchError> {
        Ok(vec![
            Draft {
                id: "d1".into(),
                to: vec!["a@x.com".into(), "b@x.com".into()],
                subject: "Re: Q3 numbers".into(),
                body: "Thanks, looks good.".into(),
                reasoning: "Acknowledges the report".into(),
                thread_id: Some("t1".into()),
            },
            Draft {
                id: "d2".into(),
                to: vec!["c@x.com".into()],
                subject: "Re: Offsite".into(),
                body: "Count me in.".into(),
                ..Draft::default()
            },
        ])
    }
    fn send_email(&self, request: &SendEmailRequest) -> Result<(), FetchError> {
        if self.fail_send {
            return Err(FetchError::Status {
                status: 500,
                detail: Some("smtp unavailable".into()),
            });
        }
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }
    fn calendar_events(&self, timeframe: &str) -> Result<Vec<RawCalendarEvent>, FetchError> {
        Ok(vec![RawCalendarEvent {
            summary: Some(format!("Board sync ({timeframe})")),
            start_time: Some("2026-10-16T09:00:00Z".into()),
            ..RawCalendarEvent::default()
        }])
    }
}

fn email(id: &str, subject: &str, preview: &str, unread: bool) -> RawEmail {
    RawEmail {
        id: id.into(),
        from: "someone@x.com".into(),
        subject: subject.into(),
        preview: preview.into(),
        date: "2026-10-16T08:00:00Z".into(),
        unread,
        thread_id: None,
    }
}

/// Answers every confirmation the same way and records what it was asked.
struct Scripted {
    answer: bool,
    asked: Vec<String>,
}

impl Scripted {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Vec::new(),
        }
    }
}

impl UserPrompt for Scripted {
    fn confirm(&mut self, message: &str) -> bool {
        self.asked.push(message.to_string());
        self.answer
    }

    fn acknowledge(&mut self, message: &str) {
        self.asked.push(message.to_string());
    }
}

fn loaded(backend: &Mailbox) -> CommsState {
    let mut comms = CommsState::new(EventLog::disabled());
    comms.load_emails(backend, 20, None).unwrap();
    comms.load_drafts(backend).unwrap();
    comms
}

// ---------------------------------------------------------------------------
// Categorization and search
// ---------------------------------------------------------------------------

#[test]
fn categorize_is_pure_and_defaults_to_work() {
    let first = categorize("Lunch?", "see you there");
    for _ in 0..10 {
        assert_eq!(categorize("Lunch?", "see you there"), first);
    }
    assert_eq!(first, EmailCategory::Work);
    assert_eq!(categorize("", ""), EmailCategory::Work);
    assert_eq!(categorize("Critical outage", ""), EmailCategory::Urgent);
    assert_eq!(categorize("New follower", "on LinkedIn"), EmailCategory::Social);
}

#[test]
fn search_phrases_map_to_gmail_queries() {
    assert_eq!(
        gmail_query_for("emails from recruiters"),
        "from:(recruiter OR hiring OR talent OR jobs OR careers)"
    );
    assert_eq!(gmail_query_for("show unread"), "is:unread");
    assert_eq!(gmail_query_for("from alice@example.com"), "from:alice@");
    assert_eq!(gmail_query_for("  Budget Review "), "budget review");
}

#[test]
fn inbox_search_passes_mapped_query() {
    let backend = Mailbox::default();
    let mut comms = CommsState::new(EventLog::disabled());
    comms.load_emails(&backend, 20, Some("unread only")).unwrap();
    comms.load_emails(&backend, 20, Some("   ")).unwrap();
    assert_eq!(
        *backend.queries.lock().unwrap(),
        vec![Some("is:unread".to_string()), None]
    );
}

#[test]
fn filter_and_badges_agree() {
    let backend = Mailbox::default();
    let mut comms = loaded(&backend);

    let badges = comms.badge_counts();
    assert_eq!(badges.all, 5);
    assert_eq!(badges.get(EmailCategory::Urgent), 1);
    assert_eq!(badges.get(EmailCategory::Personal), 1);
    assert_eq!(badges.get(EmailCategory::Promotions), 1);
    assert_eq!(badges.get(EmailCategory::Work), 2);
    assert_eq!(comms.unread_count(), 2);

    comms.set_filter("work".parse::<CategoryFilter>().unwrap());
    let ids: Vec<&str> = comms.visible_emails().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "5"]);

    comms.set_filter(CategoryFilter::All);
    assert_eq!(comms.visible_emails().count(), 5);
    assert!("spam".parse::<CategoryFilter>().is_err());
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[test]
fn approving_a_draft_sends_it_and_removes_it() {
    let backend = Mailbox::default();
    let mut comms = loaded(&backend);
    let before = comms.drafts().len();
    let mut prompt = Scripted::new(true);

    let decision = comms.approve_draft(&backend, &mut prompt, "d1", None).unwrap();

    assert_eq!(decision, Decision::Sent);
    assert_eq!(comms.drafts().len(), before - 1);
    assert!(comms.drafts().iter().all(|d| d.id != "d1"));
    assert_eq!(prompt.asked, vec!["Send email to a@x.com, b@x.com?".to_string()]);

    let sent = backend.sent.lock().unwrap();
    assert_eq!(sent[0].to, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    assert_eq!(sent[0].thread_id, "t1");
}

#[test]
fn edited_recipients_replace_the_draft_list() {
    let backend = Mailbox::default();
    let mut comms = loaded(&backend);
    let mut prompt = Scripted::new(true);

    comms
        .approve_draft(&backend, &mut prompt, "d2", Some(" x@y.com, ,z@y.com "))
        .unwrap();

    let sent = backend.sent.lock().unwrap();
    assert_eq!(sent[0].to, vec!["x@y.com".to_string(), "z@y.com".to_string()]);
    // No thread id on the draft: the draft id stands in.
    assert_eq!(sent[0].thread_id, "d2");
}

#[test]
fn declined_confirmation_keeps_the_draft() {
    let backend = Mailbox::default();
    let mut comms = loaded(&backend);
    let mut prompt = Scripted::new(false);

    let decision = comms.approve_draft(&backend, &mut prompt, "d1", None).unwrap();
    assert_eq!(decision, Decision::Cancelled);
    assert_eq!(comms.drafts().len(), 2);
    assert!(backend.sent.lock().unwrap().is_empty());
}

#[test]
fn failed_send_keeps_the_draft() {
    let backend = Mailbox {
        fail_send: true,
        ..Mailbox::default()
    };
    let mut comms = loaded(&backend);
    let mut prompt = Scripted::new(true);

    let err = comms
        .approve_draft(&backend, &mut prompt, "d1", None)
        .unwrap_err();
    assert!(err.send_attempted());
    assert!(matches!(
        err,
        DraftError::Send { ref draft_id, source: FetchError::Status { status: 500, .. } }
            if draft_id == "d1"
    ));
    assert_eq!(comms.drafts().len(), 2);
}

#[test]
fn unknown_draft_or_blank_recipients_fail_before_sending() {
    let backend = Mailbox::default();
    let mut comms = loaded(&backend);
    let mut prompt = Scripted::new(true);

    let missing = comms
        .approve_draft(&backend, &mut prompt, "d9", None)
        .unwrap_err();
    assert!(matches!(missing, DraftError::NotFound(ref id) if id == "d9"));
    assert!(!missing.send_attempted());

    let blank = comms
        .approve_draft(&backend, &mut prompt, "d1", Some(" , "))
        .unwrap_err();
    assert!(matches!(blank, DraftError::NoRecipients(_)));

    assert!(prompt.asked.is_empty());
    assert!(backend.sent.lock().unwrap().is_empty());
    assert_eq!(comms.drafts().len(), 2);
}

#[test]
fn rejecting_needs_confirmation() {
    let backend = Mailbox::default();
    let mut comms = loaded(&backend);

    let kept = comms.reject_draft(&mut Scripted::new(false), "d2").unwrap();
    assert_eq!(kept, Decision::Cancelled);
    assert_eq!(comms.drafts().len(), 2);

    let gone = comms.reject_draft(&mut Scripted::new(true), "d2").unwrap();
    assert_eq!(gone, Decision::Rejected);
    assert_eq!(comms.drafts().len(), 1);

    assert!(comms.reject_draft(&mut Scripted::new(true), "missing").is_err());
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[test]
fn legacy_calendar_fields_are_accepted() {
    let backend = Mailbox::default();
    let mut comms = CommsState::new(EventLog::disabled());
    comms.load_calendar(&backend, Timeframe::Week).unwrap();

    let event = &comms.calendar()[0];
    assert_eq!(event.title, "Board sync (week)");
    assert_eq!(event.start.as_deref(), Some("2026-10-16T09:00:00Z"));
    assert!("fortnight".parse::<Timeframe>().is_err());
}
