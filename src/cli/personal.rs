//! `execdash notes | reminders | voice`.

use anyhow::{Result, bail};
use colored::Colorize;

use super::{OutputFormat, store};
use crate::config::DashboardConfig;
use crate::storage::{FileStore, NoteList, Notebook};

fn notebook(config: &DashboardConfig) -> Result<Notebook<FileStore>> {
    Ok(Notebook::new(store()?, config.notes.clone()))
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

pub fn run_notes_list(config: &DashboardConfig, list: NoteList, all: bool, format: OutputFormat) -> Result<()> {
    let book = notebook(config)?;
    let notes = if all {
        book.notes(list)?
    } else {
        book.displayed_notes(list)?
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }
    if notes.is_empty() {
        println!("{}", "No notes yet.".dimmed());
        return Ok(());
    }
    for note in &notes {
        println!("  {} {}", note.id.to_string().dimmed(), note.text);
        println!("  {:>13} {}", "", note.timestamp.dimmed());
    }
    Ok(())
}

pub fn run_notes_add(config: &DashboardConfig, list: NoteList, text: &str) -> Result<()> {
    if !config.features.quick_notes {
        bail!("notes are disabled (features.quick_notes = false)");
    }
    match notebook(config)?.save_note(list, text)? {
        Some(note) => println!("{} Saved note {}", "✓".green().bold(), note.id),
        None => println!("{}", "Please enter some text for your note.".yellow()),
    }
    Ok(())
}

pub fn run_notes_delete(config: &DashboardConfig, list: NoteList, id: i64) -> Result<()> {
    if notebook(config)?.delete_note(list, id)? {
        println!("{} Deleted note {}", "✓".green().bold(), id);
    } else {
        println!("{}", format!("No note with id {id}").yellow());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

pub fn run_reminders_list(config: &DashboardConfig, format: OutputFormat) -> Result<()> {
    let reminders = notebook(config)?.reminders()?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reminders)?);
        return Ok(());
    }
    if reminders.is_empty() {
        println!("{}", "No reminders.".dimmed());
        return Ok(());
    }
    for reminder in &reminders {
        let check = if reminder.completed {
            "[x]".green()
        } else {
            "[ ]".normal()
        };
        let title = if reminder.completed {
            reminder.title.dimmed()
        } else {
            reminder.title.bold()
        };
        println!("  {} {} {}", check, title, reminder.id.to_string().dimmed());
        if !reminder.description.is_empty() {
            println!("      {}", reminder.description.dimmed());
        }
    }
    Ok(())
}

pub fn run_reminders_add(config: &DashboardConfig, title: &str, description: &str) -> Result<()> {
    if !config.features.personal_assistant {
        bail!("reminders are disabled (features.personal_assistant = false)");
    }
    match notebook(config)?.add_reminder(title, description)? {
        Some(reminder) => println!("{} Added reminder {}", "✓".green().bold(), reminder.id),
        None => println!("{}", "Please enter a reminder title.".yellow()),
    }
    Ok(())
}

pub fn run_reminders_toggle(config: &DashboardConfig, id: i64) -> Result<()> {
    match notebook(config)?.toggle_reminder(id)? {
        Some(true) => println!("{} Marked done", "✓".green().bold()),
        Some(false) => println!("{} Marked open", "✓".green().bold()),
        None => println!("{}", format!("No reminder with id {id}").yellow()),
    }
    Ok(())
}

pub fn run_reminders_delete(config: &DashboardConfig, id: i64) -> Result<()> {
    if notebook(config)?.delete_reminder(id)? {
        println!("{} Deleted reminder {}", "✓".green().bold(), id);
    } else {
        println!("{}", format!("No reminder with id {id}").yellow());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Voice preferences
// ---------------------------------------------------------------------------

/// Show, and optionally change, the stored voice preferences. An empty
/// `voice` clears the preferred voice.
pub fn run_voice(config: &DashboardConfig, voice: Option<&str>, remote: Option<bool>) -> Result<()> {
    let mut book = notebook(config)?;
    if let Some(name) = voice {
        book.set_preferred_voice(Some(name).filter(|n| !n.trim().is_empty()))?;
    }
    if let Some(remote) = remote {
        book.set_use_remote_tts(remote)?;
    }

    let prefs = book.voice_prefs(&config.voice)?;
    println!("{}", "Voice".bold().cyan());
    println!(
        "  {:<18} {}",
        "Preferred voice:".bold(),
        prefs.preferred_voice.as_deref().unwrap_or("system default")
    );
    println!(
        "  {:<18} {}",
        "Remote TTS:".bold(),
        if prefs.use_remote { "on".green() } else { "off".yellow() }
    );
    Ok(())
}
