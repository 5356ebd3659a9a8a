//! Inbox heuristics: keyword categories, search phrase mapping and relative
//! dates.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailCategory {
    Urgent,
    #[default]
    Work,
    Personal,
    Promotions,
    Social,
}

impl EmailCategory {
    /// Checked in this order; the first with a keyword hit wins.
    pub const ALL: [EmailCategory; 5] = [
        EmailCategory::Urgent,
        EmailCategory::Work,
        EmailCategory::Personal,
        EmailCategory::Promotions,
        EmailCategory::Social,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Promotions => "promotions",
            Self::Social => "social",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Urgent => &["urgent", "asap", "emergency", "critical", "immediate"],
            Self::Work => &["meeting", "project", "deadline", "report", "client"],
            Self::Personal => &["family", "personal", "home", "appointment"],
            Self::Promotions => &["sale", "offer", "discount", "deal", "promotion"],
            Self::Social => &["facebook", "twitter", "linkedin", "instagram", "notification"],
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for EmailCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a message from its subject and preview. Pure: the same text
/// always gives the same category, and no keyword at all gives `Work`.
pub fn categorize(subject: &str, preview: &str) -> EmailCategory {
    let text = format!("{subject} {preview}").to_lowercase();
    EmailCategory::ALL
        .into_iter()
        .find(|category| category.keywords().iter().any(|k| text.contains(k)))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Search phrases
// ---------------------------------------------------------------------------

static RECRUITER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"recruiter|hiring|talent|jobs|careers").expect("recruiter regex must compile")
});

static UNREAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"unread|new").expect("unread regex must compile"));

/// `from <name>@...`: the sender's local part, host dropped.
static FROM_ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from (.+)@").expect("from-address regex must compile"));

/// Map a plain-language inbox search onto a Gmail query.
pub fn gmail_query_for(phrase: &str) -> String {
    let text = phrase.trim().to_lowercase();
    if RECRUITER_RE.is_match(&text) {
        return "from:(recruiter OR hiring OR talent OR jobs OR careers)".to_string();
    }
    if UNREAD_RE.is_match(&text) {
        return "is:unread".to_string();
    }
    if let Some(caps) = FROM_ADDRESS_RE.captures(&text) {
        return format!("from:{}@", &caps[1]);
    }
    text
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `Just now`, `5m ago`, `3h ago`, `Yesterday`, `4d ago`, else `Mar 7`.
/// Unparseable dates are shown as given.
pub fn format_email_date(raw: &str, now: DateTime<Utc>) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "Unknown date".to_string();
    }
    let Some(date) = parse_date(raw) else {
        return raw.to_string();
    };

    let elapsed = now.signed_duration_since(date);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days == 1 {
        "Yesterday".to_string()
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        date.format("%b %-d").to_string()
    }
}
