use std::collections::VecDeque;

use serde::Serialize;

use super::AnswerSource;
use crate::tabs::TabId;

/// Escape an answer for HTML display; newlines become `<br>`.
pub fn escape_answer(answer: &str) -> String {
    let mut out = String::with_capacity(answer.len());
    for ch in answer.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(ch),
        }
    }
    out
}

/// Label shown beside an answer: the backend's tab name, else the tab id
/// in upper case.
pub fn tab_label(tab_name: Option<&str>, tab: TabId) -> String {
    match tab_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => tab.as_str().to_uppercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub question: String,
    /// Answer text, already HTML-escaped.
    pub answer_html: String,
    pub tab_label: String,
    pub source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub voice: bool,
}

/// Question/answer history, most recent first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,
}

impl Transcript {
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push_front(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&TranscriptEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str) -> TranscriptEntry {
        TranscriptEntry {
            question: question.into(),
            answer_html: String::new(),
            tab_label: "ORDERS".into(),
            source: AnswerSource::Local,
            model: None,
            voice: false,
        }
    }

    #[test]
    fn escapes_html_and_newlines() {
        assert_eq!(
            escape_answer("a & b <i>\"x\" 'y'\nnext"),
            "a &amp; b &lt;i&gt;&quot;x&quot; &#039;y&#039;<br>next"
        );
    }

    #[test]
    fn label_prefers_backend_tab_name() {
        assert_eq!(tab_label(Some("Order Volume"), TabId::Orders), "Order Volume");
        assert_eq!(tab_label(None, TabId::Orders), "ORDERS");
        assert_eq!(tab_label(Some("  "), TabId::Lab), "LAB");
    }

    #[test]
    fn newest_entry_first() {
        let mut transcript = Transcript::default();
        transcript.push(entry("first"));
        transcript.push(entry("second"));
        let questions: Vec<_> = transcript.entries().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, ["second", "first"]);
        assert_eq!(transcript.latest().map(|e| e.question.as_str()), Some("second"));
    }
}
