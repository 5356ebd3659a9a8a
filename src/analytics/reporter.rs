//! Event log aggregation for `execdash stats`.
//!
//! Per-tab load counts with fallback rate and average latency, plus the
//! assistant's backend/local split and draft decision counts.

use std::collections::BTreeMap;

use serde::Serialize;

use super::events::{Event, EventEntry};
use super::logger::EventLog;
use crate::normalize::DataSource;

// ---------------------------------------------------------------------------
// Aggregated stats
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub total_events: usize,
    pub total_loads: usize,
    pub tab_stats: Vec<TabStat>,
    pub answers: AnswerSplit,
    pub drafts: BTreeMap<String, usize>,
    pub chart_binds: usize,
    pub escalations: usize,
}

/// Load statistics for one tab.
#[derive(Debug, Clone, Serialize)]
pub struct TabStat {
    pub tab: String,
    pub loads: usize,
    pub fallbacks: usize,
    pub fallback_pct: f64,
    pub avg_latency_ms: f64,
    /// Loads that arrived after the user had moved to another tab.
    pub stale: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct AnswerSplit {
    pub backend: usize,
    pub local: usize,
    pub voice: usize,
    /// Local responder category counts.
    pub categories: BTreeMap<String, usize>,
}

impl AnswerSplit {
    pub fn total(&self) -> usize {
        self.backend + self.local
    }

    /// Percentage for a given count, 0 when there are no answers.
    pub fn pct(&self, count: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64) * 100.0
        }
    }
}

/// Stats over the last `days` days of `log` (all time for `None`).
pub fn compute_stats(log: &EventLog, days: Option<u32>) -> Stats {
    build_stats(&log.read_since_days(days))
}

pub fn build_stats(entries: &[EventEntry]) -> Stats {
    let mut stats = Stats {
        total_events: entries.len(),
        ..Stats::default()
    };
    let mut tabs: BTreeMap<&str, (usize, usize, u64, usize)> = BTreeMap::new();

    for entry in entries {
        match &entry.event {
            Event::TabLoad {
                tab,
                source,
                latency_ms,
                applied,
                ..
            } => {
                stats.total_loads += 1;
                let slot = tabs.entry(tab.as_str()).or_default();
                slot.0 += 1;
                if *source == DataSource::Fallback {
                    slot.1 += 1;
                }
                slot.2 += latency_ms;
                if !applied {
                    slot.3 += 1;
                }
            }
            Event::Answer {
                source,
                category,
                voice,
                ..
            } => {
                if source == "backend" {
                    stats.answers.backend += 1;
                } else {
                    stats.answers.local += 1;
                }
                if *voice {
                    stats.answers.voice += 1;
                }
                if let Some(category) = category {
                    *stats.answers.categories.entry(category.clone()).or_default() += 1;
                }
            }
            Event::DraftDecision { decision, .. } => {
                *stats.drafts.entry(decision.clone()).or_default() += 1;
            }
            Event::ChartBind { .. } => stats.chart_binds += 1,
            Event::Escalation { .. } => stats.escalations += 1,
            Event::Utterance { .. } => {}
        }
    }

    stats.tab_stats = tabs
        .into_iter()
        .map(|(tab, (loads, fallbacks, latency, stale))| TabStat {
            tab: tab.to_string(),
            loads,
            fallbacks,
            fallback_pct: (fallbacks as f64 / loads as f64) * 100.0,
            avg_latency_ms: latency as f64 / loads as f64,
            stale,
        })
        .collect();
    stats
        .tab_stats
        .sort_by(|a, b| b.loads.cmp(&a.loads).then_with(|| a.tab.cmp(&b.tab)));

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(event: Event) -> EventEntry {
        EventEntry {
            timestamp: "2026-01-01T00:00:00+00:00".into(),
            event,
        }
    }

    fn load(tab: &str, source: DataSource, latency_ms: u64) -> EventEntry {
        entry(Event::TabLoad {
            tab: tab.into(),
            source,
            category: None,
            latency_ms,
            applied: true,
        })
    }

    #[test]
    fn empty_log_gives_empty_stats() {
        let stats = build_stats(&[]);
        assert_eq!(stats.total_events, 0);
        assert!(stats.tab_stats.is_empty());
        assert_eq!(stats.answers.pct(0), 0.0);
    }

    #[test]
    fn per_tab_fallback_rate_and_latency() {
        let stats = build_stats(&[
            load("orders", DataSource::Backend, 100),
            load("orders", DataSource::Fallback, 300),
            load("lab", DataSource::Backend, 50),
        ]);
        assert_eq!(stats.total_loads, 3);
        let orders = &stats.tab_stats[0];
        assert_eq!(orders.tab, "orders");
        assert_eq!(orders.loads, 2);
        assert_eq!(orders.fallback_pct, 50.0);
        assert_eq!(orders.avg_latency_ms, 200.0);
    }

    #[test]
    fn answer_split_counts_sources_and_categories() {
        let answer = |source: &str, category: Option<&str>| {
            entry(Event::Answer {
                tab: "overview".into(),
                source: source.into(),
                category: category.map(str::to_string),
                voice: false,
            })
        };
        let stats = build_stats(&[
            answer("backend", None),
            answer("local", Some("general")),
            answer("local", Some("general")),
        ]);
        assert_eq!(stats.answers.backend, 1);
        assert_eq!(stats.answers.local, 2);
        assert_eq!(stats.answers.categories["general"], 2);
        assert!((stats.answers.pct(stats.answers.local) - 66.666).abs() < 0.01);
    }
}
