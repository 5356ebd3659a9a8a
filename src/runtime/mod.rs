//! The dashboard event loop.
//!
//! [`Dashboard`] owns the tab controller, chart binder, assistant and inbox
//! state. Backend calls run as jobs on an [`Executor`] and report back over a
//! channel; [`Dashboard::pump`] applies the results one at a time, so shared
//! state is only ever touched from the loop's own thread.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analytics::{Event, EventLog};
use crate::api::{AskReply, Backend, Draft, FetchError, RawCalendarEvent, RawEmail};
use crate::assistant::{AnswerResult, AssistantRouter, AudioSession, Question, SpeechOutput, VoicePrefs};
use crate::charts::panels::specs_for;
use crate::charts::{ChartBackend, ChartBinder, ChartHandle};
use crate::comms::{CommsState, Decision, DraftError, Timeframe, UserPrompt, gmail_query_for};
use crate::config::DashboardConfig;
use crate::normalize::{DataSource, LoadIssue, Section, TabPayload, normalize};
use crate::tabs::{CommitOutcome, LoadTicket, RefreshSchedule, TabController, TabId};

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where backend calls run.
pub trait Executor {
    fn execute(&self, job: Job);
}

/// One short-lived thread per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        thread::spawn(job);
    }
}

/// Holds jobs until the caller runs them, in whatever order it likes.
/// Lets a test resolve fetches out of order.
#[derive(Clone, Default)]
pub struct QueuedExecutor {
    queue: Arc<Mutex<VecDeque<Job>>>,
}

impl QueuedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the job queued at `index`. Returns false if there is none.
    pub fn run_at(&self, index: usize) -> bool {
        let job = self.lock().remove(index);
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    pub fn run_next(&self) -> bool {
        self.run_at(0)
    }

    /// Run everything queued, including jobs queued while running.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Executor for QueuedExecutor {
    fn execute(&self, job: Job) {
        self.lock().push_back(job);
    }
}

// ---------------------------------------------------------------------------
// Updates and outcomes
// ---------------------------------------------------------------------------

/// A finished job, as sent back to the loop.
enum Update {
    Loaded {
        ticket: LoadTicket,
        section: Section,
        raw: Result<Value, FetchError>,
        started: Instant,
    },
    Inbox {
        ticket: LoadTicket,
        emails: Result<Vec<RawEmail>, FetchError>,
        drafts: Result<Vec<Draft>, FetchError>,
        started: Instant,
    },
    Calendar(Result<Vec<RawCalendarEvent>, FetchError>),
    Answered {
        question: Question,
        reply: Result<AskReply, FetchError>,
    },
}

/// What applying one update did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Loaded {
        tab: TabId,
        source: DataSource,
        commit: CommitOutcome,
        /// Charts drawn from the payload.
        charts: usize,
    },
    CalendarLoaded {
        events: usize,
    },
    Answered(AnswerResult),
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct Dashboard<C: ChartBackend> {
    config: DashboardConfig,
    backend: Arc<dyn Backend>,
    executor: Box<dyn Executor>,
    tabs: TabController,
    charts: ChartBinder<C>,
    handles: HashMap<String, ChartHandle>,
    assistant: AssistantRouter,
    speech: Option<AudioSession<Box<dyn SpeechOutput>>>,
    comms: CommsState,
    refresh: RefreshSchedule,
    log: EventLog,
    tx: Sender<Update>,
    rx: Receiver<Update>,
    in_flight: usize,
}

impl<C: ChartBackend> Dashboard<C> {
    pub fn new(
        config: DashboardConfig,
        backend: Arc<dyn Backend>,
        charts: C,
        log: EventLog,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let refresh =
            RefreshSchedule::from_millis(config.api.refresh_interval_ms, config.features.auto_refresh);
        Self {
            backend,
            executor: Box::new(ThreadExecutor),
            tabs: TabController::new(),
            charts: ChartBinder::new(charts),
            handles: HashMap::new(),
            assistant: AssistantRouter::new(log.clone()),
            speech: None,
            comms: CommsState::new(log.clone()),
            refresh,
            log,
            tx,
            rx,
            in_flight: 0,
            config,
        }
    }

    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Speak answers to voice questions through `output`.
    pub fn with_speech(mut self, output: impl SpeechOutput + 'static, prefs: VoicePrefs) -> Self {
        let output: Box<dyn SpeechOutput> = Box::new(output);
        self.speech = Some(AudioSession::new(output, prefs));
        self
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn tabs(&self) -> &TabController {
        &self.tabs
    }

    pub fn charts(&self) -> &ChartBinder<C> {
        &self.charts
    }

    pub fn assistant(&self) -> &AssistantRouter {
        &self.assistant
    }

    pub fn comms(&self) -> &CommsState {
        &self.comms
    }

    pub fn comms_mut(&mut self) -> &mut CommsState {
        &mut self.comms
    }

    pub fn speech(&self) -> Option<&AudioSession<Box<dyn SpeechOutput>>> {
        self.speech.as_ref()
    }

    pub fn speech_mut(&mut self) -> Option<&mut AudioSession<Box<dyn SpeechOutput>>> {
        self.speech.as_mut()
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Jobs dispatched whose results have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Initial overview and stock loads. Starts the refresh timer.
    pub fn start(&mut self, now: Instant) {
        self.dispatch_refresh();
        self.refresh.mark(now);
    }

    /// Activate `tab`, redraw its cached charts and dispatch its load.
    pub fn switch_tab(&mut self, tab: TabId) {
        let ticket = self.tabs.switch_tab(tab);

        if let Some(payload) = self.tabs.active_context().payload.clone() {
            self.draw(&payload);
        }

        match (tab, ticket) {
            (_, Some(ticket)) => self.dispatch_load(ticket),
            (TabId::Email, None) if self.config.features.email_integration => {
                self.search_inbox(None)
            }
            (TabId::Calendar, None) if self.config.features.calendar_integration => {
                self.load_calendar(Timeframe::Today)
            }
            _ => {}
        }
    }

    /// The inline retry action for the active tab.
    pub fn retry(&mut self) {
        if self.tabs.active_tab() == TabId::Email {
            self.search_inbox(None);
        } else if let Some(ticket) = self.tabs.retry() {
            self.dispatch_load(ticket);
        }
    }

    /// Reload the inbox and drafts. `phrase` is a plain-language search.
    pub fn search_inbox(&mut self, phrase: Option<&str>) {
        let query = phrase
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(gmail_query_for);
        let ticket = self.tabs.ticket_for(TabId::Email);
        let max_results = self.config.limits.max_emails;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.spawn(move || {
            let started = Instant::now();
            let emails = backend.emails(max_results, query.as_deref());
            let drafts = backend.drafts();
            let _ = tx.send(Update::Inbox {
                ticket,
                emails,
                drafts,
                started,
            });
        });
    }

    pub fn load_calendar(&mut self, timeframe: Timeframe) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.spawn(move || {
            let _ = tx.send(Update::Calendar(backend.calendar_events(timeframe.as_str())));
        });
    }

    /// Confirm and send a loaded draft through the dashboard's backend.
    pub fn approve_draft(
        &mut self,
        prompt: &mut dyn UserPrompt,
        draft_id: &str,
        recipients: Option<&str>,
    ) -> Result<Decision, DraftError> {
        self.comms
            .approve_draft(self.backend.as_ref(), prompt, draft_id, recipients)
    }

    /// Ask about the active tab. Blank questions are ignored.
    pub fn ask(&mut self, text: &str, voice: bool) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let question = Question::new(text, self.tabs.active_context(), voice);
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.spawn(move || {
            let reply = backend.ask_tab(&question.request());
            let _ = tx.send(Update::Answered { question, reply });
        });
        true
    }

    /// Fire the periodic refresh if it is due. Returns whether it fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.refresh.is_due(now) {
            return false;
        }
        debug!("periodic refresh");
        self.refresh.mark(now);
        self.dispatch_refresh();
        true
    }

    /// Longest the loop may sleep before the next refresh.
    pub fn next_wakeup(&self, now: Instant, ceiling: Duration) -> Duration {
        self.refresh
            .time_until_due(now)
            .map_or(ceiling, |due| due.min(ceiling))
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Wait up to `timeout` for a result, apply it and everything else
    /// already waiting, then fire the refresh if due.
    pub fn pump(&mut self, timeout: Duration) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        match self.rx.recv_timeout(timeout) {
            Ok(update) => outcomes.extend(self.apply(update)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {}
        }
        while let Ok(update) = self.rx.try_recv() {
            outcomes.extend(self.apply(update));
        }
        self.tick(Instant::now());
        outcomes
    }

    /// Pump until nothing is in flight or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) -> Vec<Outcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();
        while self.in_flight > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(in_flight = self.in_flight, "gave up waiting for backend");
                break;
            }
            outcomes.extend(self.pump(deadline - now));
        }
        outcomes
    }

    fn spawn(&mut self, job: impl FnOnce() + Send + 'static) {
        self.in_flight += 1;
        self.executor.execute(Box::new(job));
    }

    fn dispatch_refresh(&mut self) {
        let [overview, stock] = self.tabs.refresh_tickets();
        self.dispatch_load(overview);
        if self.config.features.stock_ticker {
            self.dispatch_load(stock);
        }
    }

    fn dispatch_load(&mut self, ticket: LoadTicket) {
        let Some(section) = ticket.section() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.spawn(move || {
            let started = Instant::now();
            let raw = match section {
                Section::Stock => backend.stock(),
                _ => backend.overview(),
            };
            let _ = tx.send(Update::Loaded {
                ticket,
                section,
                raw,
                started,
            });
        });
    }

    fn apply(&mut self, update: Update) -> Option<Outcome> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match update {
            Update::Loaded {
                ticket,
                section,
                raw,
                started,
            } => {
                let tab = ticket.tab();
                let normalized = normalize(section, raw);
                let source = normalized.source;
                let category = normalized.issue.as_ref().map(|issue| issue.category);
                let commit = self.tabs.commit(ticket, normalized);
                let charts = self.after_commit(commit);

                let name = if section == Section::Stock {
                    "stock"
                } else {
                    tab.as_str()
                };
                self.log.record(Event::TabLoad {
                    tab: name.to_string(),
                    source,
                    category,
                    latency_ms: elapsed_ms(started),
                    applied: commit == CommitOutcome::Applied,
                });
                info!(tab = name, %source, ?commit, "load finished");

                Some(Outcome::Loaded {
                    tab,
                    source,
                    commit,
                    charts,
                })
            }
            Update::Inbox {
                ticket,
                emails,
                drafts,
                started,
            } => {
                let (source, issue) = match emails {
                    Ok(raw) => {
                        self.comms.set_emails(raw);
                        (DataSource::Backend, None)
                    }
                    Err(err) => {
                        warn!(error = %err, "inbox unavailable, keeping previous messages");
                        (DataSource::Fallback, Some(LoadIssue::from_error(None, &err)))
                    }
                };
                let category = issue.as_ref().map(|issue| issue.category);
                match drafts {
                    Ok(drafts) => self.comms.set_drafts(drafts),
                    Err(err) => warn!(error = %err, "drafts unavailable"),
                }

                let tab = ticket.tab();
                let payload = TabPayload::Email(self.comms.digest());
                let commit = self.tabs.commit_payload(ticket, payload, issue);
                self.log.record(Event::TabLoad {
                    tab: tab.as_str().to_string(),
                    source,
                    category,
                    latency_ms: elapsed_ms(started),
                    applied: commit == CommitOutcome::Applied,
                });

                Some(Outcome::Loaded {
                    tab,
                    source,
                    commit,
                    charts: 0,
                })
            }
            Update::Calendar(events) => match events {
                Ok(raw) => {
                    self.comms.set_calendar(raw);
                    Some(Outcome::CalendarLoaded {
                        events: self.comms.calendar().len(),
                    })
                }
                Err(err) => {
                    warn!(error = %err, "calendar unavailable");
                    None
                }
            },
            Update::Answered { question, reply } => {
                let result = self.assistant.resolve(question, reply);
                if result.voice
                    && let Some(session) = self.speech.as_mut()
                    && let Err(err) = session.start(&result.answer)
                {
                    warn!(error = %err, "could not speak answer");
                }
                Some(Outcome::Answered(result))
            }
        }
    }

    /// Draw the active payload's charts after an applied commit.
    fn after_commit(&mut self, commit: CommitOutcome) -> usize {
        if commit != CommitOutcome::Applied {
            return 0;
        }
        match self.tabs.active_context().payload.clone() {
            Some(payload) => self.draw(&payload),
            None => 0,
        }
    }

    fn draw(&mut self, payload: &TabPayload) -> usize {
        let mut drawn = 0;
        for chart in specs_for(payload, &self.config) {
            let bound = match self.handles.remove(&chart.canvas) {
                Some(handle) => self.charts.rebind(handle, &chart.spec),
                None => self.charts.bind(&chart.canvas, &chart.spec),
            };
            match bound {
                Ok(handle) => {
                    self.log.record(Event::ChartBind {
                        canvas: chart.canvas.clone(),
                        kind: chart.spec.kind().to_string(),
                    });
                    self.handles.insert(chart.canvas, handle);
                    drawn += 1;
                }
                Err(err) => warn!(canvas = %chart.canvas, error = %err, "chart failed to draw"),
            }
        }
        drawn
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
