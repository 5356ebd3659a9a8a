//! Communications panel state: inbox, AI-drafted replies, calendar.
//!
//! Sending or discarding a draft is irreversible, so both go through a
//! [`UserPrompt`] confirmation before anything happens. A failed send is
//! returned as an error for the caller to acknowledge; the draft stays in
//! the list.

pub mod classify;

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analytics::{Event, EventLog};
use crate::api::{Backend, Draft, FetchError, RawCalendarEvent, RawEmail, SendEmailRequest};

pub use classify::{EmailCategory, categorize, format_email_date, gmail_query_for};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// An inbox message with its derived category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub preview: String,
    pub date: String,
    pub unread: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub category: EmailCategory,
}

impl From<RawEmail> for Email {
    fn from(raw: RawEmail) -> Self {
        let category = categorize(&raw.subject, &raw.preview);
        Self {
            id: raw.id,
            from: raw.from,
            subject: raw.subject,
            preview: raw.preview,
            date: raw.date,
            unread: raw.unread,
            thread_id: raw.thread_id,
            category,
        }
    }
}

/// The inbox as the assistant sees it on the communications tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmailDigest {
    pub emails: Vec<Email>,
    pub drafts: Vec<Draft>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub title: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

impl From<RawCalendarEvent> for CalendarEvent {
    fn from(raw: RawCalendarEvent) -> Self {
        let title = raw
            .title
            .or(raw.summary)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Meeting".to_string());
        Self {
            id: raw.id,
            title,
            start: raw.start.or(raw.start_time),
            end: raw.end,
            location: raw.location.filter(|l| !l.trim().is_empty()),
            attendees: raw.attendees,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    #[default]
    Today,
    Week,
    Month,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => bail!("unknown timeframe '{other}' (expected today, week or month)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// Blocking yes/no and acknowledgment dialogs.
pub trait UserPrompt {
    fn confirm(&mut self, message: &str) -> bool;
    fn acknowledge(&mut self, message: &str);
}

/// Outcome of an approve or reject request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Sent,
    Rejected,
    Cancelled,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Why a draft decision did not go through.
///
/// Only [`DraftError::Send`] means the backend was asked to send; the other
/// variants fail before any side effect.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("no draft with id {0}")]
    NotFound(String),

    #[error("draft {0} has no recipients")]
    NoRecipients(String),

    #[error("sending draft {draft_id} failed")]
    Send {
        draft_id: String,
        #[source]
        source: FetchError,
    },
}

impl DraftError {
    /// True when the send call was made and failed.
    pub fn send_attempted(&self) -> bool {
        matches!(self, Self::Send { .. })
    }
}

/// Split an edited comma-separated recipient field.
pub fn parse_recipients(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Filter applied to the inbox list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(EmailCategory),
}

impl std::str::FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        EmailCategory::parse(s)
            .map(Self::Only)
            .with_context(|| format!("unknown email category '{s}'"))
    }
}

/// Per-category message counts, plus `all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BadgeCounts {
    pub all: usize,
    pub by_category: BTreeMap<EmailCategory, usize>,
}

impl BadgeCounts {
    pub fn get(&self, category: EmailCategory) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

pub struct CommsState {
    emails: Vec<Email>,
    drafts: Vec<Draft>,
    calendar: Vec<CalendarEvent>,
    filter: CategoryFilter,
    log: EventLog,
}

impl CommsState {
    pub fn new(log: EventLog) -> Self {
        Self {
            emails: Vec::new(),
            drafts: Vec::new(),
            calendar: Vec::new(),
            filter: CategoryFilter::All,
            log,
        }
    }

    pub fn emails(&self) -> &[Email] {
        &self.emails
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn calendar(&self) -> &[CalendarEvent] {
        &self.calendar
    }

    pub fn set_emails(&mut self, raw: Vec<RawEmail>) {
        self.emails = raw.into_iter().map(Email::from).collect();
    }

    pub fn set_drafts(&mut self, drafts: Vec<Draft>) {
        self.drafts = drafts;
    }

    pub fn set_calendar(&mut self, raw: Vec<RawCalendarEvent>) {
        self.calendar = raw.into_iter().map(CalendarEvent::from).collect();
    }

    /// Fetch the inbox. `search` is a plain-language phrase, mapped to a
    /// Gmail query.
    pub fn load_emails(
        &mut self,
        backend: &dyn Backend,
        max_results: usize,
        search: Option<&str>,
    ) -> Result<(), FetchError> {
        let query = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(gmail_query_for);
        let raw = backend.emails(max_results, query.as_deref())?;
        info!(count = raw.len(), query = query.as_deref().unwrap_or(""), "emails loaded");
        self.set_emails(raw);
        Ok(())
    }

    pub fn load_drafts(&mut self, backend: &dyn Backend) -> Result<(), FetchError> {
        let drafts = backend.drafts()?;
        info!(count = drafts.len(), "drafts loaded");
        self.set_drafts(drafts);
        Ok(())
    }

    pub fn load_calendar(
        &mut self,
        backend: &dyn Backend,
        timeframe: Timeframe,
    ) -> Result<(), FetchError> {
        let events = backend.calendar_events(timeframe.as_str())?;
        self.set_calendar(events);
        Ok(())
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    /// Messages passing the current filter.
    pub fn visible_emails(&self) -> impl Iterator<Item = &Email> {
        let filter = self.filter;
        self.emails.iter().filter(move |e| match filter {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => e.category == category,
        })
    }

    pub fn badge_counts(&self) -> BadgeCounts {
        let mut by_category: BTreeMap<EmailCategory, usize> =
            EmailCategory::ALL.into_iter().map(|c| (c, 0)).collect();
        for email in &self.emails {
            *by_category.entry(email.category).or_default() += 1;
        }
        BadgeCounts {
            all: self.emails.len(),
            by_category,
        }
    }

    pub fn digest(&self) -> EmailDigest {
        EmailDigest {
            emails: self.emails.clone(),
            drafts: self.drafts.clone(),
        }
    }

    pub fn unread_count(&self) -> usize {
        self.emails.iter().filter(|e| e.unread).count()
    }

    // -----------------------------------------------------------------------
    // Draft decisions
    // -----------------------------------------------------------------------

    /// Confirm and send a draft. `recipients` replaces the draft's `to`
    /// list when given (an edited comma-separated field). On success the
    /// draft is removed.
    pub fn approve_draft(
        &mut self,
        backend: &dyn Backend,
        prompt: &mut dyn UserPrompt,
        draft_id: &str,
        recipients: Option<&str>,
    ) -> Result<Decision, DraftError> {
        let index = self.draft_index(draft_id)?;
        let draft = &self.drafts[index];

        let to = match recipients {
            Some(field) => parse_recipients(field),
            None => draft.to.clone(),
        };
        if to.is_empty() {
            return Err(DraftError::NoRecipients(draft_id.to_string()));
        }

        if !prompt.confirm(&format!("Send email to {}?", to.join(", "))) {
            self.record_decision(draft_id, Decision::Cancelled.as_str(), to.len());
            return Ok(Decision::Cancelled);
        }

        let request = SendEmailRequest {
            to,
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            thread_id: draft
                .thread_id
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| draft.id.clone()),
        };

        if let Err(err) = backend.send_email(&request) {
            warn!(draft = draft_id, error = %err, "send failed");
            self.record_decision(draft_id, "failed", request.to.len());
            return Err(DraftError::Send {
                draft_id: draft_id.to_string(),
                source: err,
            });
        }

        self.drafts.remove(index);
        info!(draft = draft_id, recipients = request.to.len(), "draft sent");
        self.record_decision(draft_id, Decision::Sent.as_str(), request.to.len());
        Ok(Decision::Sent)
    }

    /// Confirm and discard a draft.
    pub fn reject_draft(
        &mut self,
        prompt: &mut dyn UserPrompt,
        draft_id: &str,
    ) -> Result<Decision, DraftError> {
        let index = self.draft_index(draft_id)?;
        if !prompt.confirm("Reject this draft? This cannot be undone.") {
            self.record_decision(draft_id, Decision::Cancelled.as_str(), 0);
            return Ok(Decision::Cancelled);
        }
        self.drafts.remove(index);
        self.record_decision(draft_id, Decision::Rejected.as_str(), 0);
        Ok(Decision::Rejected)
    }

    /// Flag a message for human review.
    pub fn escalate(&self, email_id: &str, notes: &str) -> Result<()> {
        let email = self
            .emails
            .iter()
            .find(|e| e.id == email_id)
            .with_context(|| format!("no email with id {email_id}"))?;
        info!(email = email_id, "escalated to human review");
        self.log.record(Event::Escalation {
            email_id: email.id.clone(),
            subject: email.subject.clone(),
            notes: notes.trim().to_string(),
        });
        Ok(())
    }

    fn draft_index(&self, draft_id: &str) -> Result<usize, DraftError> {
        self.drafts
            .iter()
            .position(|d| d.id == draft_id)
            .ok_or_else(|| DraftError::NotFound(draft_id.to_string()))
    }

    fn record_decision(&self, draft_id: &str, decision: &str, recipients: usize) {
        self.log.record(Event::DraftDecision {
            draft_id: draft_id.to_string(),
            decision: decision.to_string(),
            recipients,
        });
    }
}
