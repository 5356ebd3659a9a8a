use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    CEO_NOTES, KeyValueStore, PREFERRED_VOICE_NAME, QUICK_NOTES, QUICK_REMINDERS,
    USE_ELEVEN_LABS, load_or_default, save,
};
use crate::assistant::VoicePrefs;
use crate::config::schema::{NotesConfig, VoiceConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Creation time in epoch milliseconds, unique within its list.
    pub id: i64,
    pub text: String,
    /// Local creation time as displayed.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    /// RFC 3339 creation time.
    pub created: String,
}

/// The two note collections: the overview notepad and the personal tab's
/// quick notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteList {
    #[default]
    Ceo,
    Quick,
}

impl NoteList {
    pub fn key(self) -> &'static str {
        match self {
            Self::Ceo => CEO_NOTES,
            Self::Quick => QUICK_NOTES,
        }
    }
}

impl std::str::FromStr for NoteList {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ceo" | "overview" => Ok(Self::Ceo),
            "quick" | "personal" => Ok(Self::Quick),
            other => anyhow::bail!("unknown note list '{other}' (expected ceo or quick)"),
        }
    }
}

/// Notes, reminders and voice preferences over a key/value store. Lists are
/// newest first and capped.
pub struct Notebook<S: KeyValueStore> {
    store: S,
    limits: NotesConfig,
}

impl<S: KeyValueStore> Notebook<S> {
    pub fn new(store: S, limits: NotesConfig) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    pub fn notes(&self, list: NoteList) -> Result<Vec<Note>> {
        load_or_default(&self.store, list.key())
    }

    /// The notes shown on the panel.
    pub fn displayed_notes(&self, list: NoteList) -> Result<Vec<Note>> {
        let mut notes = self.notes(list)?;
        notes.truncate(self.limits.display_notes);
        Ok(notes)
    }

    /// Add a note at the front. Blank text is ignored.
    pub fn save_note(&mut self, list: NoteList, text: &str) -> Result<Option<Note>> {
        self.save_note_at(list, text, Local::now())
    }

    pub fn save_note_at(
        &mut self,
        list: NoteList,
        text: &str,
        now: DateTime<Local>,
    ) -> Result<Option<Note>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let mut notes = self.notes(list)?;
        let note = Note {
            id: next_id(now.timestamp_millis(), notes.iter().map(|n| n.id)),
            text: text.to_string(),
            timestamp: now.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        };
        notes.insert(0, note.clone());
        notes.truncate(self.limits.max_notes);
        save(&mut self.store, list.key(), &notes)?;
        Ok(Some(note))
    }

    /// Remove a note. Returns whether one was removed.
    pub fn delete_note(&mut self, list: NoteList, id: i64) -> Result<bool> {
        let mut notes = self.notes(list)?;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Ok(false);
        }
        save(&mut self.store, list.key(), &notes)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Reminders
    // -----------------------------------------------------------------------

    pub fn reminders(&self) -> Result<Vec<Reminder>> {
        load_or_default(&self.store, QUICK_REMINDERS)
    }

    pub fn add_reminder(&mut self, title: &str, description: &str) -> Result<Option<Reminder>> {
        self.add_reminder_at(title, description, Utc::now())
    }

    pub fn add_reminder_at(
        &mut self,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Reminder>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let mut reminders = self.reminders()?;
        let reminder = Reminder {
            id: next_id(now.timestamp_millis(), reminders.iter().map(|r| r.id)),
            title: title.to_string(),
            description: description.trim().to_string(),
            completed: false,
            created: now.to_rfc3339(),
        };
        reminders.insert(0, reminder.clone());
        reminders.truncate(self.limits.max_reminders);
        save(&mut self.store, QUICK_REMINDERS, &reminders)?;
        Ok(Some(reminder))
    }

    /// Flip a reminder's completed flag. Returns the new state.
    pub fn toggle_reminder(&mut self, id: i64) -> Result<Option<bool>> {
        let mut reminders = self.reminders()?;
        let Some(reminder) = reminders.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        reminder.completed = !reminder.completed;
        let completed = reminder.completed;
        save(&mut self.store, QUICK_REMINDERS, &reminders)?;
        Ok(Some(completed))
    }

    pub fn delete_reminder(&mut self, id: i64) -> Result<bool> {
        let mut reminders = self.reminders()?;
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Ok(false);
        }
        save(&mut self.store, QUICK_REMINDERS, &reminders)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Voice preferences
    // -----------------------------------------------------------------------

    /// Stored preferences over the configured defaults.
    pub fn voice_prefs(&self, defaults: &VoiceConfig) -> Result<VoicePrefs> {
        let mut prefs = VoicePrefs::from_config(defaults);
        if let Some(Value::String(name)) = self.store.get(PREFERRED_VOICE_NAME)?
            && !name.trim().is_empty()
        {
            prefs.preferred_voice = Some(name);
        }
        match self.store.get(USE_ELEVEN_LABS)? {
            Some(Value::Bool(flag)) => prefs.use_remote = flag,
            Some(Value::String(flag)) => prefs.use_remote = flag != "false",
            _ => {}
        }
        Ok(prefs)
    }

    pub fn set_preferred_voice(&mut self, name: Option<&str>) -> Result<()> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => self
                .store
                .set(PREFERRED_VOICE_NAME, Value::String(name.to_string())),
            None => self.store.remove(PREFERRED_VOICE_NAME),
        }
    }

    pub fn set_use_remote_tts(&mut self, enabled: bool) -> Result<()> {
        self.store.set(USE_ELEVEN_LABS, Value::Bool(enabled))
    }
}

/// `now_ms`, bumped past every existing id so two saves in the same
/// millisecond stay distinct.
fn next_id(now_ms: i64, existing: impl Iterator<Item = i64>) -> i64 {
    match existing.max() {
        Some(max) if max >= now_ms => max + 1,
        _ => now_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn notebook() -> Notebook<MemoryStore> {
        Notebook::new(MemoryStore::new(), NotesConfig::default())
    }

    #[test]
    fn blank_note_is_ignored() {
        let mut book = notebook();
        assert!(book.save_note(NoteList::Ceo, "   ").unwrap().is_none());
        assert!(book.notes(NoteList::Ceo).unwrap().is_empty());
    }

    #[test]
    fn notes_are_capped_newest_first() {
        let mut book = Notebook::new(
            MemoryStore::new(),
            NotesConfig {
                max_notes: 2,
                display_notes: 1,
                max_reminders: 50,
            },
        );
        for text in ["one", "two", "three"] {
            book.save_note(NoteList::Quick, text).unwrap();
        }
        let texts: Vec<_> = book
            .notes(NoteList::Quick)
            .unwrap()
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(texts, ["three", "two"]);
        assert_eq!(book.displayed_notes(NoteList::Quick).unwrap().len(), 1);
        assert!(book.notes(NoteList::Ceo).unwrap().is_empty());
    }

    #[test]
    fn same_millisecond_ids_are_distinct() {
        let mut book = notebook();
        let now = Local.with_ymd_and_hms(2026, 3, 20, 14, 5, 9).unwrap();
        let a = book.save_note_at(NoteList::Ceo, "a", now).unwrap().unwrap();
        let b = book.save_note_at(NoteList::Ceo, "b", now).unwrap().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.timestamp, "3/20/2026, 2:05:09 PM");
    }

    #[test]
    fn reminders_add_toggle_delete() {
        let mut book = notebook();
        let first = book.add_reminder("Call board", "re: Q3").unwrap().unwrap();
        let second = book.add_reminder("Review audit", "").unwrap().unwrap();
        assert_eq!(book.reminders().unwrap()[0].id, second.id);

        assert_eq!(book.toggle_reminder(first.id).unwrap(), Some(true));
        assert_eq!(book.toggle_reminder(first.id).unwrap(), Some(false));
        assert_eq!(book.toggle_reminder(-1).unwrap(), None);

        assert!(book.delete_reminder(first.id).unwrap());
        assert!(!book.delete_reminder(first.id).unwrap());
        assert_eq!(book.reminders().unwrap().len(), 1);
        assert!(book.add_reminder(" ", "x").unwrap().is_none());
    }

    #[test]
    fn voice_prefs_persist_and_override_defaults() {
        let mut book = notebook();
        let defaults = VoiceConfig::default();
        assert_eq!(book.voice_prefs(&defaults).unwrap(), VoicePrefs::from_config(&defaults));

        book.set_preferred_voice(Some("Samantha")).unwrap();
        book.set_use_remote_tts(false).unwrap();
        let prefs = book.voice_prefs(&defaults).unwrap();
        assert_eq!(prefs.preferred_voice.as_deref(), Some("Samantha"));
        assert!(!prefs.use_remote);

        book.set_preferred_voice(None).unwrap();
        assert_eq!(book.voice_prefs(&defaults).unwrap().preferred_voice, None);
    }

    #[test]
    fn string_flag_from_older_storage_is_understood() {
        let mut store = MemoryStore::new();
        store
            .set(USE_ELEVEN_LABS, Value::String("false".into()))
            .unwrap();
        let book = Notebook::new(store, NotesConfig::default());
        assert!(!book.voice_prefs(&VoiceConfig::default()).unwrap().use_remote);
    }
}
