//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `execdash tab <id>` / `execdash watch`: render tabs, interactive session
//! - `execdash ask "question"`: assistant with local fallback
//! - `execdash notes|reminders|voice`: personal state
//! - `execdash emails|drafts|calendar`: communications panel
//! - `execdash stats`: event log summary
//! - `execdash health`: check backend, config, logs
//! - `execdash config show|init|set|reset`: configuration management

pub mod comms;
pub mod dashboard;
pub mod personal;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::Colorize;

use crate::analytics::EventLog;
use crate::analytics::reporter::{self, Stats};
use crate::api::{Backend, HttpBackend};
use crate::comms::UserPrompt;
use crate::config::{self, DashboardConfig};
use crate::storage::FileStore;

pub use dashboard::{run_ask, run_tab, run_watch};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Confirmation prompts
// ---------------------------------------------------------------------------

/// Confirmations and acknowledgments on the terminal.
pub struct StdinPrompt<R: BufRead = io::StdinLock<'static>> {
    input: R,
    /// Answer every confirmation with yes without asking.
    assume_yes: bool,
}

impl StdinPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self::with_input(io::stdin().lock(), assume_yes)
    }
}

impl<R: BufRead> StdinPrompt<R> {
    pub fn with_input(input: R, assume_yes: bool) -> Self {
        Self { input, assume_yes }
    }
}

impl<R: BufRead> UserPrompt for StdinPrompt<R> {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            println!("{} {}", message, "yes".dimmed());
            return true;
        }
        print!("{} {} ", message, "[y/N]".dimmed());
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn acknowledge(&mut self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
        if self.assume_yes {
            return;
        }
        eprint!("  {} ", "Press Enter to continue".dimmed());
        let mut line = String::new();
        let _ = self.input.read_line(&mut line);
    }
}

// ---------------------------------------------------------------------------
// Shared construction
// ---------------------------------------------------------------------------

pub(crate) fn backend(config: &DashboardConfig) -> HttpBackend {
    HttpBackend::from_config(&config.api)
}

pub(crate) fn event_log(config: &DashboardConfig) -> EventLog {
    EventLog::from_config(&config.logging)
}

pub(crate) fn store() -> Result<FileStore> {
    FileStore::open_default()
}

// ---------------------------------------------------------------------------
// execdash stats
// ---------------------------------------------------------------------------

/// Summarize the event log.
pub fn run_stats(config: &DashboardConfig, format: OutputFormat, days: Option<u32>) -> Result<()> {
    let stats = reporter::compute_stats(&event_log(config), days);

    if stats.total_events == 0 {
        println!(
            "{}",
            "No data yet. Open a few tabs or ask a question to see stats.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Csv => print_stats_csv(&stats),
        OutputFormat::Table => print_stats_table(&stats),
    }

    Ok(())
}

fn print_stats_table(stats: &Stats) {
    println!("{}", "Dashboard Activity Report".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();

    println!("  {} {}", "Events:      ".bold(), stats.total_events);
    println!("  {} {}", "Tab loads:   ".bold(), stats.total_loads);
    println!("  {} {}", "Chart binds: ".bold(), stats.chart_binds);
    println!("  {} {}", "Escalations: ".bold(), stats.escalations);
    println!();

    let answers = &stats.answers;
    println!("{}", "Assistant".bold().cyan());
    println!(
        "  Backend: {} ({:.0}%)  Local: {} ({:.0}%)  Voice: {}",
        answers.backend,
        answers.pct(answers.backend),
        answers.local,
        answers.pct(answers.local),
        answers.voice,
    );
    if !answers.categories.is_empty() {
        let categories: Vec<String> = answers
            .categories
            .iter()
            .map(|(name, count)| format!("{name} {count}"))
            .collect();
        println!("  {} {}", "Local topics:".dimmed(), categories.join(", "));
    }
    println!();

    if !stats.drafts.is_empty() {
        println!("{}", "Draft Decisions".bold().cyan());
        for (decision, count) in &stats.drafts {
            println!("  {:<12} {:>6}", decision, count);
        }
        println!();
    }

    if !stats.tab_stats.is_empty() {
        println!("{}", "Loads by Tab".bold().cyan());
        println!(
            "  {:<16} {:>6} {:>10} {:>12} {:>6}",
            "Tab", "Loads", "Fallback", "Avg latency", "Stale"
        );
        println!("  {}", "-".repeat(56));

        for (i, tab) in stats.tab_stats.iter().enumerate() {
            let line = format!(
                "  {:<16} {:>6} {:>9.1}% {:>10.0}ms {:>6}",
                truncate(&tab.tab, 16),
                tab.loads,
                tab.fallback_pct,
                tab.avg_latency_ms,
                tab.stale,
            );
            if i % 2 == 0 {
                println!("{}", line);
            } else {
                println!("{}", line.dimmed());
            }
        }
    }
}

fn print_stats_csv(stats: &Stats) {
    println!("tab,loads,fallbacks,fallback_pct,avg_latency_ms,stale");
    for tab in &stats.tab_stats {
        println!(
            "{},{},{},{:.1},{:.1},{}",
            tab.tab, tab.loads, tab.fallbacks, tab.fallback_pct, tab.avg_latency_ms, tab.stale,
        );
    }
}

// ---------------------------------------------------------------------------
// execdash health
// ---------------------------------------------------------------------------

/// Check the backend, configuration files, event log and local storage.
pub fn run_health(config: &DashboardConfig) -> Result<()> {
    println!("{}", "execdash Health Check".bold().cyan());
    println!("{}", "=".repeat(50));

    let global = config::global_config_file();
    let global_ok = global.as_ref().is_some_and(|p| p.exists());
    print_health_item(
        "Global config",
        global_ok,
        &global
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no home directory".to_string()),
    );

    let api = backend(config);
    let (backend_ok, detail) = match api.overview() {
        Ok(_) => (true, format!("reachable at {}", config.api.base_url)),
        Err(err) => (false, format!("{} ({})", err, err.category())),
    };
    print_health_item("Backend", backend_ok, &detail);

    let log = event_log(config);
    match log.path() {
        Some(path) if path.exists() => print_health_item(
            "Event log",
            true,
            &format!("{} entries", log.read_all().len()),
        ),
        Some(_) => print_health_item("Event log", false, "no log file yet"),
        None => print_health_item("Event log", false, "disabled"),
    }

    match store() {
        Ok(store) => {
            let exists = store.path().exists();
            print_health_item(
                "Local storage",
                exists,
                &if exists {
                    store.path().display().to_string()
                } else {
                    "nothing saved yet".to_string()
                },
            );
        }
        Err(err) => print_health_item("Local storage", false, &err.to_string()),
    }

    if !backend_ok {
        println!();
        println!(
            "  {} Tabs will show built-in fallback data until the backend is reachable",
            "Hint:".dimmed()
        );
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// execdash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective execdash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.execdash/config.toml", global_exists);
    print_source(".execdash.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "EXECDASH_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Write a default config file at `~/.execdash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    println!("  {}", "Edit the file to point at your backend.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate to `max_len` characters, appending "…" if truncated.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
pub(crate) fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ab", 2), "ab");
        assert_eq!(truncate("réimbursement", 3), "ré…");
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }

    #[test]
    fn stdin_prompt_reads_answers() {
        let mut prompt = StdinPrompt::with_input(&b"y\nno\n"[..], false);
        assert!(prompt.confirm("Send?"));
        assert!(!prompt.confirm("Send?"));
        assert!(!prompt.confirm("Send?"));
    }

    #[test]
    fn assume_yes_skips_input() {
        let mut prompt = StdinPrompt::with_input(&b""[..], true);
        assert!(prompt.confirm("Reject this draft? This cannot be undone."));
    }
}
