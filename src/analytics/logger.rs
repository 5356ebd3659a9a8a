use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;

use super::events::{Event, EventEntry};
use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Append-only JSONL event log (`~/.execdash/events.jsonl` by default).
///
/// Writes are best-effort: an unwritable log never interrupts the
/// dashboard. A disabled log records nothing.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let path = if config.path.trim().is_empty() {
            default_log_path()
        } else {
            Some(PathBuf::from(config.path.trim()))
        };
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one event, stamped with the current time.
    pub fn record(&self, event: Event) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = append_entry(path, &EventEntry::now(event)) {
            tracing::debug!(path = %path.display(), error = %err, "event log write failed");
        }
    }

    /// Every readable entry. Malformed lines are skipped; a missing file
    /// reads as empty.
    pub fn read_all(&self) -> Vec<EventEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<EventEntry>(&line).ok())
            .collect()
    }

    /// Entries from the last `days` days, or all entries for `None`.
    pub fn read_since_days(&self, days: Option<u32>) -> Vec<EventEntry> {
        let entries = self.read_all();
        let Some(days) = days else {
            return entries;
        };

        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
        entries
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_entry(path: &Path, entry: &EventEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Default location of the event log.
pub fn default_log_path() -> Option<PathBuf> {
    crate::config::state_dir().map(|dir| dir.join("events.jsonl"))
}
