use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use execdash::cli::{self, OutputFormat, comms, personal};
use execdash::comms::{CategoryFilter, Timeframe};
use execdash::config::{self, DashboardConfig};
use execdash::storage::NoteList;
use execdash::tabs::TabId;
use execdash::web;

#[derive(Debug, Parser)]
#[command(name = "execdash")]
#[command(about = "Executive dashboard: tabs, charts and a context-aware assistant")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load one tab and print its data and charts
    Tab {
        /// Tab id: overview, orders, compliance, reimbursement, costs, lab,
        /// regional, forecasting, market, milestones
        tab: TabId,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Ask the assistant about a tab
    Ask {
        /// The question
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,
        /// Tab to ask about
        #[arg(long, default_value = "overview")]
        tab: TabId,
        /// Speak the answer
        #[arg(long)]
        speak: bool,
    },
    /// Interactive session: switch tabs, ask questions, auto-refresh
    Watch {
        /// Tab to open first
        #[arg(default_value = "overview")]
        tab: TabId,
    },
    /// Serve the JSON API
    Serve {
        /// Listen address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
    },
    /// CEO notes and quick notes
    Notes {
        #[command(subcommand)]
        action: Option<NotesAction>,
        /// Use the personal tab's quick notes instead of the CEO notepad
        #[arg(long, global = true)]
        quick: bool,
    },
    /// Personal reminders
    Reminders {
        #[command(subcommand)]
        action: Option<RemindersAction>,
    },
    /// Show or change voice preferences
    Voice {
        /// Preferred voice name (empty string clears it)
        #[arg(long)]
        name: Option<String>,
        /// Use the remote text-to-speech service
        #[arg(long)]
        remote: Option<bool>,
    },
    /// List and search the inbox
    Emails {
        /// Plain-language search, e.g. "from alice@x.com" or "unread"
        #[arg(long)]
        search: Option<String>,
        /// Category: all, urgent, work, personal, promotions, social
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        /// Flag a message for human review
        #[arg(long, value_name = "EMAIL_ID")]
        escalate: Option<String>,
        /// Notes attached to an escalation
        #[arg(long, default_value = "")]
        notes: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Review AI-drafted replies
    Drafts {
        #[command(subcommand)]
        action: Option<DraftsAction>,
    },
    /// Show calendar events
    Calendar {
        /// today (default), week, month
        #[arg(default_value = "today")]
        timeframe: Timeframe,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Summarize the event log
    Stats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
    },
    /// Check backend, config, event log and storage
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum NotesAction {
    /// List notes (default)
    List {
        /// Show every stored note, not just the displayed ones
        #[arg(long)]
        all: bool,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Save a note
    Add {
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
    /// Delete a note by id
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
enum RemindersAction {
    /// List reminders (default)
    List {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Add a reminder
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Mark a reminder done or open again
    Toggle { id: i64 },
    /// Delete a reminder by id
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
enum DraftsAction {
    /// List drafts awaiting review (default)
    List {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Confirm and send a draft
    Approve {
        id: String,
        /// Replacement recipients, comma-separated
        #[arg(long)]
        to: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Discard a draft
    Reject {
        id: String,
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one value, e.g. `execdash config set features.voice false`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn init_tracing(config: &DashboardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let app = App::parse();
    let config = config::load();
    init_tracing(&config);

    match app.command {
        Commands::Tab { tab, format } => {
            cli::run_tab(&config, tab, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Ask {
            question,
            tab,
            speak,
        } => cli::run_ask(&config, tab, &question.join(" "), speak),
        Commands::Watch { tab } => cli::run_watch(&config, tab),
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            web::serve(&config, &addr)
        }
        Commands::Notes { action, quick } => {
            let list = if quick { NoteList::Quick } else { NoteList::Ceo };
            match action {
                None => personal::run_notes_list(&config, list, false, OutputFormat::Table),
                Some(NotesAction::List { all, format }) => personal::run_notes_list(
                    &config,
                    list,
                    all,
                    OutputFormat::from_str_opt(Some(&format)),
                ),
                Some(NotesAction::Add { text }) => {
                    personal::run_notes_add(&config, list, &text.join(" "))
                }
                Some(NotesAction::Delete { id }) => personal::run_notes_delete(&config, list, id),
            }
        }
        Commands::Reminders { action } => match action {
            None => personal::run_reminders_list(&config, OutputFormat::Table),
            Some(RemindersAction::List { format }) => {
                personal::run_reminders_list(&config, OutputFormat::from_str_opt(Some(&format)))
            }
            Some(RemindersAction::Add { title, description }) => {
                personal::run_reminders_add(&config, &title, &description)
            }
            Some(RemindersAction::Toggle { id }) => personal::run_reminders_toggle(&config, id),
            Some(RemindersAction::Delete { id }) => personal::run_reminders_delete(&config, id),
        },
        Commands::Voice { name, remote } => personal::run_voice(&config, name.as_deref(), remote),
        Commands::Emails {
            search,
            category,
            escalate,
            notes,
            format,
        } => match escalate {
            Some(email_id) => comms::run_escalate(&config, &email_id, &notes),
            None => comms::run_emails(
                &config,
                search.as_deref(),
                category,
                OutputFormat::from_str_opt(Some(&format)),
            ),
        },
        Commands::Drafts { action } => match action {
            None => comms::run_drafts(&config, OutputFormat::Table),
            Some(DraftsAction::List { format }) => {
                comms::run_drafts(&config, OutputFormat::from_str_opt(Some(&format)))
            }
            Some(DraftsAction::Approve { id, to, yes }) => {
                comms::run_draft_approve(&config, &id, to.as_deref(), yes)
            }
            Some(DraftsAction::Reject { id, yes }) => comms::run_draft_reject(&config, &id, yes),
        },
        Commands::Calendar { timeframe, format } => comms::run_calendar(
            &config,
            timeframe,
            OutputFormat::from_str_opt(Some(&format)),
        ),
        Commands::Stats { format, days } => {
            cli::run_stats(&config, OutputFormat::from_str_opt(Some(&format)), days)
        }
        Commands::Health => cli::run_health(&config),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
