//! `execdash emails | drafts | calendar`.

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

use super::{OutputFormat, StdinPrompt, backend, csv_field, event_log, truncate};
use crate::comms::{
    CalendarEvent, CategoryFilter, CommsState, Decision, EmailCategory, Timeframe, UserPrompt,
    format_email_date,
};
use crate::config::DashboardConfig;

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// List the inbox, optionally searched with a plain-language phrase and
/// filtered to one category.
pub fn run_emails(
    config: &DashboardConfig,
    search: Option<&str>,
    filter: CategoryFilter,
    format: OutputFormat,
) -> Result<()> {
    let api = backend(config);
    let mut comms = CommsState::new(event_log(config));
    comms
        .load_emails(&api, config.limits.max_emails, search)
        .context("Failed to load emails")?;
    comms.set_filter(filter);

    match format {
        OutputFormat::Json => {
            let visible: Vec<_> = comms.visible_emails().collect();
            println!("{}", serde_json::to_string_pretty(&visible)?);
        }
        OutputFormat::Csv => {
            println!("id,from,subject,date,unread,category");
            for email in comms.visible_emails() {
                println!(
                    "{},{},{},{},{},{}",
                    csv_field(&email.id),
                    csv_field(&email.from),
                    csv_field(&email.subject),
                    csv_field(&email.date),
                    email.unread,
                    email.category,
                );
            }
        }
        OutputFormat::Table => print_inbox(&comms),
    }
    Ok(())
}

fn print_inbox(comms: &CommsState) {
    println!("{}", "Inbox".bold().cyan());
    println!("{}", "=".repeat(70));

    let badges = comms.badge_counts();
    let mut tabs = vec![format!("all {}", badges.all)];
    tabs.extend(
        EmailCategory::ALL
            .into_iter()
            .map(|c| format!("{} {}", c, badges.get(c))),
    );
    println!("  {}", tabs.join("  ").dimmed());
    println!();

    let now = Utc::now();
    let mut shown = 0;
    for email in comms.visible_emails() {
        let marker = if email.unread { "●".cyan() } else { " ".normal() };
        let subject = truncate(&email.subject, 40);
        println!(
            "  {} {:<40} {:<22} {:>10}",
            marker,
            if email.unread { subject.bold() } else { subject.normal() },
            truncate(&email.from, 22),
            format_email_date(&email.date, now).dimmed(),
        );
        println!("      {} {}", format!("[{}]", email.category).dimmed(), truncate(&email.preview, 60).dimmed());
        shown += 1;
    }
    if shown == 0 {
        println!("  {}", "No messages.".dimmed());
    }
    println!();
    println!("  {} unread", comms.unread_count());
}

/// Flag a message for human review.
pub fn run_escalate(config: &DashboardConfig, email_id: &str, notes: &str) -> Result<()> {
    let api = backend(config);
    let mut comms = CommsState::new(event_log(config));
    comms
        .load_emails(&api, config.limits.max_emails, None)
        .context("Failed to load emails")?;
    comms.escalate(email_id, notes)?;
    println!("{} Escalated {} for human review", "✓".green().bold(), email_id.bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

pub fn run_drafts(config: &DashboardConfig, format: OutputFormat) -> Result<()> {
    let comms = load_drafts(config)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(comms.drafts())?);
        return Ok(());
    }

    println!("{}", "Drafts Awaiting Review".bold().cyan());
    println!("{}", "=".repeat(70));
    if comms.drafts().is_empty() {
        println!("  {}", "No pending drafts.".dimmed());
    }
    for draft in comms.drafts() {
        println!("  {} {}", draft.id.dimmed(), draft.subject.bold());
        println!("    {} {}", "to:".dimmed(), draft.to.join(", "));
        if config.features.ai_reasoning && !draft.reasoning.is_empty() {
            println!("    {} {}", "why:".dimmed(), truncate(&draft.reasoning, 80));
        }
        println!("    {}", truncate(&draft.body.replace('\n', " "), 80));
    }
    Ok(())
}

/// Confirm and send a draft. `to` overrides the recipients
/// (comma-separated).
pub fn run_draft_approve(
    config: &DashboardConfig,
    draft_id: &str,
    to: Option<&str>,
    assume_yes: bool,
) -> Result<()> {
    let api = backend(config);
    let mut comms = load_drafts(config)?;
    let mut prompt = StdinPrompt::new(assume_yes);

    match comms.approve_draft(&api, &mut prompt, draft_id, to) {
        Ok(Decision::Sent) => {
            println!("{} Email sent", "✓".green().bold());
            Ok(())
        }
        Ok(_) => {
            println!("{}", "Cancelled.".dimmed());
            Ok(())
        }
        Err(err) if err.send_attempted() => {
            let err = anyhow::Error::from(err);
            prompt.acknowledge(&format!("Failed to send email: {err:#}"));
            Err(err)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn run_draft_reject(config: &DashboardConfig, draft_id: &str, assume_yes: bool) -> Result<()> {
    let mut comms = load_drafts(config)?;
    let mut prompt = StdinPrompt::new(assume_yes);
    match comms.reject_draft(&mut prompt, draft_id)? {
        Decision::Rejected => println!("{} Draft rejected", "✓".green().bold()),
        _ => println!("{}", "Cancelled.".dimmed()),
    }
    Ok(())
}

fn load_drafts(config: &DashboardConfig) -> Result<CommsState> {
    let api = backend(config);
    let mut comms = CommsState::new(event_log(config));
    comms.load_drafts(&api).context("Failed to load drafts")?;
    Ok(comms)
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

pub fn run_calendar(config: &DashboardConfig, timeframe: Timeframe, format: OutputFormat) -> Result<()> {
    let api = backend(config);
    let mut comms = CommsState::new(event_log(config));
    comms
        .load_calendar(&api, timeframe)
        .context("Failed to load calendar")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(comms.calendar())?),
        OutputFormat::Csv => {
            println!("title,start,end,location");
            for event in comms.calendar() {
                println!(
                    "{},{},{},{}",
                    csv_field(&event.title),
                    csv_field(event.start.as_deref().unwrap_or("")),
                    csv_field(event.end.as_deref().unwrap_or("")),
                    csv_field(event.location.as_deref().unwrap_or("")),
                );
            }
        }
        OutputFormat::Table => {
            println!("{}", format!("Calendar: {}", timeframe.as_str()).bold().cyan());
            println!("{}", "=".repeat(50));
            print_calendar(comms.calendar(), usize::MAX);
        }
    }
    Ok(())
}

pub(crate) fn print_calendar(events: &[CalendarEvent], limit: usize) {
    if events.is_empty() {
        println!("  {}", "No upcoming events.".dimmed());
        return;
    }
    for event in events.iter().take(limit) {
        println!(
            "  {:<20} {}",
            event.start.as_deref().unwrap_or("TBD").dimmed(),
            event.title.bold()
        );
        if let Some(location) = &event.location {
            println!("  {:<20} {}", "", location.dimmed());
        }
    }
}
