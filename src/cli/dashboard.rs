//! Terminal rendering of dashboard tabs, and the interactive `watch` loop.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use super::{OutputFormat, backend, event_log, store};
use crate::assistant::voice::NO_SPEECH;
use crate::assistant::{
    AnswerResult, AnswerSource, LoggingSpeech, Recognizer, RecognizerEvent, VoiceAction, VoiceLoop,
};
use crate::charts::TerminalBackend;
use crate::charts::panels::specs_for;
use crate::charts::progress_ring::format_thousands;
use crate::config::DashboardConfig;
use crate::normalize::{OverviewKpis, StockQuote, TabPayload};
use crate::runtime::{Dashboard, Outcome};
use crate::storage::Notebook;
use crate::tabs::{ActiveContext, TabId};

/// How long one-shot commands wait for the backend.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

fn open(config: &DashboardConfig) -> Dashboard<TerminalBackend> {
    let log = event_log(config);
    Dashboard::new(
        config.clone(),
        Arc::new(backend(config)),
        TerminalBackend::new(),
        log,
    )
}

// ---------------------------------------------------------------------------
// execdash tab
// ---------------------------------------------------------------------------

/// Load one tab and print it with its charts.
pub fn run_tab(config: &DashboardConfig, tab: TabId, format: OutputFormat) -> Result<()> {
    let mut dash = open(config);
    dash.start(Instant::now());
    dash.switch_tab(tab);
    dash.settle(SETTLE_TIMEOUT);

    let context = dash.tabs().active_context();
    match format {
        OutputFormat::Json | OutputFormat::Csv => {
            println!("{}", serde_json::to_string_pretty(context)?);
        }
        OutputFormat::Table => render(&dash, context),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// execdash ask
// ---------------------------------------------------------------------------

/// Answer one question in the context of `tab`.
pub fn run_ask(config: &DashboardConfig, tab: TabId, question: &str, speak: bool) -> Result<()> {
    if !config.features.ai_assistant {
        bail!("the assistant is disabled (features.ai_assistant = false)");
    }

    let mut dash = open(config);
    if speak {
        let prefs = Notebook::new(store()?, config.notes.clone()).voice_prefs(&config.voice)?;
        dash = dash.with_speech(LoggingSpeech::new(event_log(config)), prefs);
    }
    dash.start(Instant::now());
    dash.switch_tab(tab);
    dash.settle(SETTLE_TIMEOUT);

    if !dash.ask(question, speak) {
        bail!("question is empty");
    }
    for outcome in dash.settle(SETTLE_TIMEOUT) {
        if let Outcome::Answered(answer) = outcome {
            print_answer(&answer);
            return Ok(());
        }
    }
    bail!("no answer within {}s", SETTLE_TIMEOUT.as_secs())
}

fn print_answer(answer: &AnswerResult) {
    let source = match answer.source {
        AnswerSource::Backend => "backend".green(),
        AnswerSource::Local => "local".yellow(),
    };
    println!(
        "{} {} {}",
        answer.tab_label.bold().cyan(),
        "·".dimmed(),
        answer.model.as_deref().unwrap_or("").dimmed()
    );
    println!("{}", answer.answer);
    println!("  {} {}", "source:".dimmed(), source);
    if let Some(reason) = answer.fallback_reason {
        println!("  {} {}", "backend unavailable:".dimmed(), reason);
    }
}

// ---------------------------------------------------------------------------
// execdash watch
// ---------------------------------------------------------------------------

const WATCH_HELP: &str =
    "commands: tab <id> | ask <question> | say <question> | voice | retry | help | quit";

/// Interactive session: the event loop runs on this thread while stdin is
/// read on another, so loads and answers print as they arrive.
pub fn run_watch(config: &DashboardConfig, initial: TabId) -> Result<()> {
    let prefs = Notebook::new(store()?, config.notes.clone()).voice_prefs(&config.voice)?;
    let mut dash = open(config).with_speech(LoggingSpeech::new(event_log(config)), prefs);

    let (lines_tx, lines_rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("execdash-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines().map_while(Result::ok) {
                if lines_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start input reader")?;

    println!("{}", "execdash".bold().cyan());
    println!("{}", WATCH_HELP.dimmed());
    dash.start(Instant::now());
    if initial != TabId::Overview {
        dash.switch_tab(initial);
    }

    let mut voice = VoiceMode::new(config);

    loop {
        let now = Instant::now();
        let wait = voice.clamp_wait(now, dash.next_wakeup(now, Duration::from_millis(200)));
        for outcome in dash.pump(wait) {
            report(&dash, &outcome);
        }
        if let Err(err) = voice.poll(Instant::now()) {
            println!("{} {:#}", "voice:".red(), err);
        }

        match lines_rx.try_recv() {
            Ok(line) => {
                if !handle_line(&mut dash, &mut voice, config, line.trim()) {
                    break;
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
    }

    voice.shutdown();
    if let Some(session) = dash.speech_mut() {
        session.stop();
    }
    Ok(())
}

/// Apply one input line. Returns false to quit.
fn handle_line(
    dash: &mut Dashboard<TerminalBackend>,
    voice: &mut VoiceMode,
    config: &DashboardConfig,
    line: &str,
) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "quit" | "exit" | "q" => return false,
        "voice" if !config.features.voice || !config.features.ai_assistant => {
            println!("{}", "Voice mode is disabled.".yellow());
        }
        "voice" => {
            if let Err(err) = voice.toggle(dash) {
                println!("{} {:#}", "voice:".red(), err);
            }
        }
        _ if voice.listening() => voice.heard(dash, line),
        "" => {}
        "help" => println!("{}", WATCH_HELP.dimmed()),
        "retry" => dash.retry(),
        "tab" => match rest.parse::<TabId>() {
            Ok(tab) => dash.switch_tab(tab),
            Err(err) => println!("{}", err.to_string().red()),
        },
        "ask" | "say" if !config.features.ai_assistant => {
            println!("{}", "The assistant is disabled.".yellow());
        }
        "ask" | "say" => {
            if !dash.ask(rest, command == "say") {
                println!("{}", "Please enter a question.".yellow());
            }
        }
        other => println!("{} {}", "unknown command:".red(), other),
    }
    true
}

// ---------------------------------------------------------------------------
// Full voice mode
// ---------------------------------------------------------------------------

/// Speech-to-text for the terminal: while listening, each typed line is
/// what was heard. Recognition ends after every line, as a browser
/// recognizer does after each result.
#[derive(Debug, Default)]
struct TypedSpeech {
    listening: bool,
}

impl TypedSpeech {
    fn finish(&mut self) {
        self.listening = false;
    }
}

impl Recognizer for TypedSpeech {
    fn start(&mut self) -> Result<()> {
        self.listening = true;
        println!("{}", "🎤 listening (type what you would say, or 'voice' to stop)".dimmed());
        Ok(())
    }

    fn stop(&mut self) {
        self.listening = false;
    }
}

/// The voice loop plus its pending restart timer.
struct VoiceMode {
    voice: VoiceLoop<TypedSpeech>,
    restart_at: Option<Instant>,
}

impl VoiceMode {
    fn new(config: &DashboardConfig) -> Self {
        Self {
            voice: VoiceLoop::new(TypedSpeech::default(), &config.voice),
            restart_at: None,
        }
    }

    fn listening(&self) -> bool {
        self.voice.is_active() && self.voice.recognizer().listening
    }

    fn toggle(&mut self, dash: &mut Dashboard<TerminalBackend>) -> Result<()> {
        let announcement = self.voice.toggle()?;
        if !self.voice.is_active() {
            self.restart_at = None;
        }
        println!("{}", announcement.bold().magenta());
        if let Some(session) = dash.speech_mut() {
            session.start(announcement)?;
        }
        Ok(())
    }

    /// Feed one heard line through the loop.
    fn heard(&mut self, dash: &mut Dashboard<TerminalBackend>, line: &str) {
        let event = if line.trim().is_empty() {
            RecognizerEvent::Error(NO_SPEECH.to_string())
        } else {
            RecognizerEvent::Transcript(line.to_string())
        };
        let VoiceAction::Ask(question) = self.voice.handle(event) else {
            return;
        };

        self.voice.recognizer_mut().finish();
        dash.ask(&question, true);
        if let VoiceAction::RestartAfter(delay) = self.voice.handle(RecognizerEvent::End) {
            self.restart_at = Some(Instant::now() + delay);
        }
    }

    /// Restart listening once the scheduled delay has passed.
    fn poll(&mut self, now: Instant) -> Result<()> {
        if self.restart_at.is_some_and(|at| at <= now) {
            self.restart_at = None;
            self.voice.restart()?;
        }
        Ok(())
    }

    fn clamp_wait(&self, now: Instant, wait: Duration) -> Duration {
        self.restart_at
            .map_or(wait, |at| wait.min(at.saturating_duration_since(now)))
    }

    fn shutdown(&mut self) {
        self.restart_at = None;
        if self.voice.is_active() {
            let _ = self.voice.toggle();
        }
    }
}

fn report(dash: &Dashboard<TerminalBackend>, outcome: &Outcome) {
    match outcome {
        Outcome::Loaded { commit, .. } if *commit == crate::tabs::CommitOutcome::Applied => {
            render(dash, dash.tabs().active_context());
        }
        Outcome::Loaded { .. } => {
            if let Some(quote) = dash.tabs().stock() {
                print_ticker(quote);
            }
        }
        Outcome::CalendarLoaded { events } => {
            super::comms::print_calendar(dash.comms().calendar(), dash.config().limits.calendar_events);
            println!("  {}", format!("{events} events").dimmed());
        }
        Outcome::Answered(answer) => print_answer(answer),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(dash: &Dashboard<TerminalBackend>, context: &ActiveContext) {
    let config = dash.config();
    println!();
    println!("{}", context.tab.label().bold().cyan());
    println!("{}", "=".repeat(50));

    if let Some(issue) = &context.issue {
        let retry = if issue.retryable { " (type 'retry')" } else { "" };
        println!(
            "  {} Showing fallback data: {}{}",
            "⚠".yellow().bold(),
            issue.message,
            retry.dimmed()
        );
    }

    let Some(payload) = &context.payload else {
        match context.tab {
            TabId::Calendar => super::comms::print_calendar(dash.comms().calendar(), config.limits.calendar_events),
            _ => println!("  {}", "Loading…".dimmed()),
        }
        return;
    };

    print_payload(payload, config);

    for chart in specs_for(payload, config) {
        if let Some(frame) = dash.charts().backend().frame(&chart.canvas) {
            println!();
            print!("{frame}");
        }
    }
}

fn print_payload(payload: &TabPayload, config: &DashboardConfig) {
    match payload {
        TabPayload::Overview(data) => {
            let kpis = OverviewKpis::from_overview(data, &config.limits);
            kv("Monthly orders", &format!("{} ({:+.1}% MoM)", format_thousands(kpis.monthly_orders), kpis.orders_growth_mom));
            kv("Compliance", &format!("{:.1}% ({} returns)", kpis.compliance_percentage, format_thousands(kpis.total_returns)));
            kv("Reimbursement", &format!("{:.1}% ({} claims)", kpis.reimbursement_percentage, format_thousands(kpis.claims_reimbursed)));
            kv("Lab TAT", &format!("{:.1}h (target {:.0}h)", kpis.lab_tat_hours, kpis.lab_target_hours));
            kv("Operating costs", &format!("${:.2}M", kpis.operating_costs_millions));
            kv("Next quarter", &format!("{:.0}K orders", kpis.forecast_thousands));
            for alert in &kpis.alerts {
                println!("  {} {}", "!".red().bold(), alert);
            }
        }
        TabPayload::Orders(data) => {
            kv("Monthly orders", &format_thousands(data.monthly_orders));
            kv("Daily average", &format_thousands(data.average_daily_orders));
            kv("Peak day", &format_thousands(data.peak_day_orders));
            kv("Growth", &format!("{:+.1}% MoM  {:+.1}% YoY", data.growth_metrics.mom, data.growth_metrics.yoy));
        }
        TabPayload::Compliance(data) => {
            kv("Compliance rate", &format!("{:.1}%", data.compliance_rate));
            kv("Return rate", &format!("{:.1}%", data.overall_return_rate));
            kv("Rejection rate", &format!("{:.2}%", data.rejection_rate));
            for reason in &data.top_return_reasons {
                println!("  {:<28} {:>8}", super::truncate(&reason.reason, 28), format_thousands(reason.count));
            }
        }
        TabPayload::Reimbursement(data) => {
            kv("Reimbursed", &format!("${}", format_thousands(data.total_reimbursed)));
            kv("Pending", &format!("${}", format_thousands(data.pending_amount)));
            kv("Rate", &format!("{:.1}%", data.reimbursement_percentage));
            for payer in &data.by_payer {
                println!(
                    "  {:<24} {:>6.1}% reimbursed",
                    super::truncate(&payer.payer_name, 24),
                    payer.reimbursement_rate
                );
            }
        }
        TabPayload::Costs(data) => {
            kv("Operating costs", &format!("${}", format_thousands(data.total_operating_costs)));
            kv("Cost per test", &format!("${:.2}", data.cost_per_test));
        }
        TabPayload::Lab(data) => {
            kv("Turnaround", &format!("{:.1}h (target {:.0}h)", data.average_turnaround_hours, data.target_turnaround_hours));
            kv("Utilization", &format!("{:.1}%", data.lab_capacity.utilization_percentage));
            kv("Efficiency", &format!("{:.1}", data.efficiency_score));
            kv("Error rate", &format!("{:.1}%", data.error_rate));
        }
        TabPayload::Regional(data) => {
            for territory in data.territories.iter().take(config.limits.top_territories) {
                println!(
                    "  {:<20} {:>10} {:>+7.1}%",
                    super::truncate(&territory.territory_name, 20),
                    format_thousands(territory.orders),
                    territory.growth
                );
            }
        }
        TabPayload::Forecasting(data) => {
            kv("Next quarter", &format_thousands(data.next_quarter_orders));
            kv("Confidence", &format!("{:.0}%", data.confidence_level));
            kv("Market growth", &format!("{:.1}%", data.assumptions.market_growth_rate));
            kv("Seasonality", &data.assumptions.seasonality_factor);
        }
        TabPayload::Market(data) => {
            for alert in data.critical_alerts.iter().take(config.limits.critical_alerts) {
                println!("  {} {}", "!".red().bold(), alert);
            }
            for news in data.latest_news.iter().take(config.limits.market_news) {
                println!("  {} {}", format!("[{}]", news.importance).dimmed(), news.title);
            }
            for update in data.competitor_updates.iter().take(config.limits.competitor_updates) {
                println!("  {}: {}", update.competitor_name.bold(), update.description);
            }
        }
        TabPayload::Milestones(data) => {
            kv(
                "Projects",
                &format!(
                    "{} total, {} on track, {} at risk, {} delayed",
                    data.total_projects, data.projects_on_track, data.projects_at_risk, data.projects_delayed
                ),
            );
            for project in data.active_projects.iter().take(config.limits.recent_projects) {
                println!(
                    "  {:<28} {:>5.0}% {}",
                    super::truncate(&project.project_name, 28),
                    project.completion_percentage,
                    project.overall_status.to_string().dimmed()
                );
            }
        }
        TabPayload::Stock(quote) => print_ticker(quote),
        TabPayload::Email(digest) => {
            kv("Messages", &digest.emails.len().to_string());
            kv("Drafts awaiting review", &digest.drafts.len().to_string());
            for email in digest.emails.iter().take(config.limits.email_preview) {
                println!("  {} {}", format!("[{}]", email.category).dimmed(), email.subject);
            }
        }
    }
}

fn print_ticker(quote: &StockQuote) {
    let price = &quote.current_price;
    let change = format!("{:+.2} ({}%)", price.change, price.change_percentage);
    let change = if price.change >= 0.0 {
        change.green()
    } else {
        change.red()
    };
    println!("  {} ${:.2} {}", "Stock".bold(), price.price, change);
}

fn kv(label: &str, value: &str) {
    println!("  {:<18} {}", format!("{label}:").bold(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::EventLog;
    use crate::api::{
        AskReply, AskRequest, Backend, Draft, FetchError, RawCalendarEvent, RawEmail,
        SendEmailRequest,
    };
    use crate::runtime::QueuedExecutor;
    use serde_json::Value;

    struct Offline;

    fn down<T>() -> Result<T, FetchError> {
        Err(FetchError::Transport("connection refused".into()))
    }

    impl Backend for Offline {
        fn overview(&self) -> Result<Value, FetchError> {
            down()
        }
        fn stock(&self) -> Result<Value, FetchError> {
            down()
        }
        fn ask_tab(&self, _: &AskRequest<'_>) -> Result<AskReply, FetchError> {
            down()
        }
        fn emails(&self, _: usize, _: Option<&str>) -> Result<Vec<RawEmail>, FetchError> {
            down()
        }
        fn drafts(&self) -> Result<Vec<Draft>, FetchError> {
            down()
        }
        fn send_email(&self, _: &SendEmailRequest) -> Result<(), FetchError> {
            down()
        }
        fn calendar_events(&self, _: &str) -> Result<Vec<RawCalendarEvent>, FetchError> {
            down()
        }
    }

    fn session(config: &DashboardConfig) -> (Dashboard<TerminalBackend>, QueuedExecutor) {
        let queue = QueuedExecutor::new();
        let dash = Dashboard::new(
            config.clone(),
            Arc::new(Offline),
            TerminalBackend::new(),
            EventLog::disabled(),
        )
        .with_executor(queue.clone());
        (dash, queue)
    }

    #[test]
    fn heard_line_is_asked_with_voice_and_listening_resumes() {
        let config = DashboardConfig::default();
        let (mut dash, queue) = session(&config);
        let mut voice = VoiceMode::new(&config);

        assert!(handle_line(&mut dash, &mut voice, &config, "voice"));
        assert!(voice.listening());

        assert!(handle_line(&mut dash, &mut voice, &config, "how are orders"));
        assert_eq!(queue.pending(), 1);
        assert!(!voice.listening());
        let restart = voice.restart_at.expect("restart scheduled");

        voice.poll(restart).unwrap();
        assert!(voice.listening());

        queue.run_all();
        match dash.pump(Duration::ZERO).as_slice() {
            [Outcome::Answered(answer)] => assert!(answer.voice),
            other => panic!("expected one answer, got {other:?}"),
        }
    }

    #[test]
    fn silence_keeps_listening_without_asking() {
        let config = DashboardConfig::default();
        let (mut dash, queue) = session(&config);
        let mut voice = VoiceMode::new(&config);

        handle_line(&mut dash, &mut voice, &config, "voice");
        handle_line(&mut dash, &mut voice, &config, "");
        assert_eq!(queue.pending(), 0);
        assert!(voice.listening());
        assert!(voice.restart_at.is_none());
    }

    #[test]
    fn toggling_off_cancels_the_pending_restart() {
        let config = DashboardConfig::default();
        let (mut dash, _queue) = session(&config);
        let mut voice = VoiceMode::new(&config);

        handle_line(&mut dash, &mut voice, &config, "voice");
        handle_line(&mut dash, &mut voice, &config, "what is our risk");
        handle_line(&mut dash, &mut voice, &config, "voice");

        assert!(voice.restart_at.is_none());
        voice.poll(Instant::now() + Duration::from_secs(5)).unwrap();
        assert!(!voice.listening());
        assert!(!voice.voice.is_active());
    }

    #[test]
    fn voice_mode_respects_the_feature_flag() {
        let mut config = DashboardConfig::default();
        config.features.voice = false;
        let (mut dash, _queue) = session(&config);
        let mut voice = VoiceMode::new(&config);

        handle_line(&mut dash, &mut voice, &config, "voice");
        assert!(!voice.voice.is_active());
    }
}
