//! JSON API handlers.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content. Handlers that start a
//! backend load wait for it to settle before answering, so a response always
//! reflects the load it triggered.

use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::analytics::EventLog;
use crate::analytics::reporter;
use crate::assistant::TranscriptEntry;
use crate::charts::SeriesSpec;
use crate::charts::panels::specs_for;
use crate::comms::{BadgeCounts, CategoryFilter, DraftError, Email, Timeframe, UserPrompt};
use crate::config::{self, DashboardConfig};
use crate::normalize::StockQuote;
use crate::runtime::Outcome;
use crate::storage::{NoteList, Reminder};
use crate::tabs::{ActiveContext, PanelState, TabId};

use super::{WebState, content_type_json, error_response};

/// Longest a request waits on the backend.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// JSON request and response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ContextResponse<'a> {
    context: &'a ActiveContext,
    panels: Vec<PanelEntry>,
    stock: Option<&'a StockQuote>,
}

#[derive(Serialize)]
struct PanelEntry {
    tab: TabId,
    #[serde(flatten)]
    state: PanelState,
}

#[derive(Serialize)]
struct ChartEntry {
    canvas: String,
    kind: &'static str,
    spec: SeriesSpec,
}

#[derive(Deserialize)]
struct TabRequest {
    tab: String,
}

#[derive(Deserialize)]
struct AskBody {
    question: String,
    #[serde(default)]
    voice: bool,
}

#[derive(Deserialize)]
struct NoteBody {
    text: String,
}

#[derive(Deserialize)]
struct ReminderBody {
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Serialize)]
struct VoiceResponse {
    preferred_voice: Option<String>,
    use_remote: bool,
}

#[derive(Deserialize)]
struct VoiceBody {
    #[serde(default)]
    preferred_voice: Option<String>,
    #[serde(default)]
    use_remote: Option<bool>,
}

#[derive(Serialize)]
struct InboxResponse<'a> {
    emails: Vec<&'a Email>,
    badges: BadgeCounts,
    unread: usize,
}

#[derive(Deserialize)]
struct EscalateBody {
    email_id: String,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct ApproveBody {
    id: String,
    /// Edited comma-separated recipients.
    #[serde(default)]
    to: Option<String>,
    /// The browser shows its own confirmation dialog.
    #[serde(default)]
    confirmed: bool,
}

#[derive(Deserialize)]
struct RejectBody {
    id: String,
    #[serde(default)]
    confirmed: bool,
}

/// Config API response: the full config as a JSON value plus the raw TOML.
#[derive(Serialize)]
struct ConfigResponse {
    config: DashboardConfig,
    toml_text: String,
}

/// Config update request: a list of key-value pairs.
#[derive(Deserialize)]
struct ConfigUpdateRequest {
    updates: Vec<ConfigKeyValue>,
}

#[derive(Deserialize)]
struct ConfigKeyValue {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct HealthResponse {
    backend_reachable: bool,
    backend_detail: String,
    config_exists: bool,
    log_exists: bool,
    in_flight: usize,
    live_charts: usize,
}

/// Answers the dashboard's confirmation dialog with the choice the browser
/// already made, and keeps acknowledgments for the response body.
struct BrowserPrompt {
    confirmed: bool,
    messages: Vec<String>,
}

impl UserPrompt for BrowserPrompt {
    fn confirm(&mut self, _message: &str) -> bool {
        self.confirmed
    }

    fn acknowledge(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type ApiResponse = Result<Response<Cursor<Vec<u8>>>>;

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> ApiResponse {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a str, what: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| format!("invalid JSON in {what} request"))
}

/// Look up a query parameter, decoding `+` and `%XX` escapes.
fn query_param(url: &str, key: &str) -> Option<String> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key { Some(percent_decode(v)) } else { None }
    })
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    Err(_) => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse the `?days=N` query parameter from a URL.
fn parse_days_param(url: &str) -> Option<u32> {
    query_param(url, "days")?.parse().ok()
}

fn note_list(url: &str) -> Result<NoteList> {
    query_param(url, "list").map_or(Ok(NoteList::Ceo), |list| list.parse())
}

fn id_param(url: &str) -> Result<i64> {
    query_param(url, "id")
        .context("missing ?id= parameter")?
        .parse()
        .context("id must be an integer")
}

fn context_response(state: &WebState) -> ApiResponse {
    let tabs = state.dash.tabs();
    json_response(&ContextResponse {
        context: tabs.active_context(),
        panels: tabs
            .panels()
            .iter()
            .map(|(tab, state)| PanelEntry { tab, state })
            .collect(),
        stock: tabs.stock(),
    })
}

/// Make sure the inbox and drafts have been fetched at least once.
fn ensure_inbox(state: &mut WebState) {
    let comms = state.dash.comms();
    if comms.emails().is_empty() && comms.drafts().is_empty() {
        state.dash.search_inbox(None);
        state.dash.settle(SETTLE_TIMEOUT);
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// `GET /api/context`: active tab, its payload and the panel states.
pub fn get_context(state: &mut WebState) -> ApiResponse {
    context_response(state)
}

/// `POST /api/tab`: `{ "tab": "orders" }`.
pub fn post_tab(state: &mut WebState, body: &str) -> ApiResponse {
    let req: TabRequest = parse_body(body, "tab")?;
    let tab: TabId = match req.tab.parse() {
        Ok(tab) => tab,
        Err(err) => return Ok(error_response(400, &err.to_string())),
    };
    state.dash.switch_tab(tab);
    state.dash.settle(SETTLE_TIMEOUT);
    context_response(state)
}

/// `POST /api/retry`: reload the active tab.
pub fn post_retry(state: &mut WebState) -> ApiResponse {
    state.dash.retry();
    state.dash.settle(SETTLE_TIMEOUT);
    context_response(state)
}

/// `GET /api/charts`: chart specs for the active payload.
pub fn get_charts(state: &mut WebState) -> ApiResponse {
    let charts: Vec<ChartEntry> = match &state.dash.tabs().active_context().payload {
        Some(payload) => specs_for(payload, state.dash.config())
            .into_iter()
            .map(|chart| ChartEntry {
                kind: chart.spec.kind(),
                canvas: chart.canvas,
                spec: chart.spec,
            })
            .collect(),
        None => Vec::new(),
    };
    json_response(&charts)
}

/// `GET /api/stock`: the ticker, if one has loaded.
pub fn get_stock(state: &mut WebState) -> ApiResponse {
    json_response(&state.dash.tabs().stock())
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

/// `POST /api/ask`: `{ "question": "...", "voice": false }`.
pub fn post_ask(state: &mut WebState, body: &str) -> ApiResponse {
    if !state.dash.config().features.ai_assistant {
        return Ok(error_response(403, "assistant is disabled"));
    }
    let req: AskBody = parse_body(body, "ask")?;
    if !state.dash.ask(&req.question, req.voice) {
        return Ok(error_response(400, "Please enter a question"));
    }
    let answer = state
        .dash
        .settle(SETTLE_TIMEOUT)
        .into_iter()
        .find_map(|outcome| match outcome {
            Outcome::Answered(result) => Some(result),
            _ => None,
        });
    match answer {
        Some(result) => json_response(&result),
        None => Ok(error_response(504, "assistant did not answer in time")),
    }
}

/// `GET /api/transcript`: every question and answer so far.
pub fn get_transcript(state: &mut WebState) -> ApiResponse {
    let entries: Vec<&TranscriptEntry> = state.dash.assistant().transcript().entries().collect();
    json_response(&entries)
}

// ---------------------------------------------------------------------------
// Personal
// ---------------------------------------------------------------------------

/// `GET /api/notes?list=ceo|quick`: the displayed notes.
pub fn get_notes(state: &mut WebState, url: &str) -> ApiResponse {
    let notes = state.notebook.displayed_notes(note_list(url)?)?;
    json_response(&notes)
}

/// `POST /api/notes?list=ceo|quick`: `{ "text": "..." }`.
pub fn post_note(state: &mut WebState, url: &str, body: &str) -> ApiResponse {
    if !state.dash.config().features.quick_notes {
        return Ok(error_response(403, "notes are disabled"));
    }
    let req: NoteBody = parse_body(body, "note")?;
    match state.notebook.save_note(note_list(url)?, &req.text)? {
        Some(note) => json_response(&note),
        None => Ok(error_response(400, "Please enter some text for your note.")),
    }
}

/// `DELETE /api/notes?list=ceo|quick&id=N`.
pub fn delete_note(state: &mut WebState, url: &str) -> ApiResponse {
    let deleted = state.notebook.delete_note(note_list(url)?, id_param(url)?)?;
    json_response(&serde_json::json!({ "deleted": deleted }))
}

/// `GET /api/reminders`.
pub fn get_reminders(state: &mut WebState) -> ApiResponse {
    let reminders: Vec<Reminder> = state.notebook.reminders()?;
    json_response(&reminders)
}

/// `POST /api/reminders`: `{ "title": "...", "description": "..." }`.
pub fn post_reminder(state: &mut WebState, body: &str) -> ApiResponse {
    if !state.dash.config().features.personal_assistant {
        return Ok(error_response(403, "the personal assistant is disabled"));
    }
    let req: ReminderBody = parse_body(body, "reminder")?;
    match state.notebook.add_reminder(&req.title, &req.description)? {
        Some(reminder) => json_response(&reminder),
        None => Ok(error_response(400, "Please enter a reminder title.")),
    }
}

/// `POST /api/reminders/toggle?id=N`.
pub fn toggle_reminder(state: &mut WebState, url: &str) -> ApiResponse {
    if !state.dash.config().features.personal_assistant {
        return Ok(error_response(403, "the personal assistant is disabled"));
    }
    match state.notebook.toggle_reminder(id_param(url)?)? {
        Some(completed) => json_response(&serde_json::json!({ "completed": completed })),
        None => Ok(error_response(404, "no such reminder")),
    }
}

/// `DELETE /api/reminders?id=N`.
pub fn delete_reminder(state: &mut WebState, url: &str) -> ApiResponse {
    let deleted = state.notebook.delete_reminder(id_param(url)?)?;
    json_response(&serde_json::json!({ "deleted": deleted }))
}

/// `GET /api/voice`: stored voice preferences.
pub fn get_voice(state: &mut WebState) -> ApiResponse {
    voice_response(state)
}

/// `PUT /api/voice`: `{ "preferred_voice": "...", "use_remote": true }`.
/// An empty voice name clears the preference.
pub fn put_voice(state: &mut WebState, body: &str) -> ApiResponse {
    let req: VoiceBody = parse_body(body, "voice")?;
    if let Some(name) = req.preferred_voice.as_deref() {
        state
            .notebook
            .set_preferred_voice(Some(name).filter(|n| !n.trim().is_empty()))?;
    }
    if let Some(remote) = req.use_remote {
        state.notebook.set_use_remote_tts(remote)?;
    }
    let prefs = state.notebook.voice_prefs(&state.dash.config().voice)?;
    if let Some(session) = state.dash.speech_mut() {
        session.set_prefs(prefs);
    }
    voice_response(state)
}

fn voice_response(state: &WebState) -> ApiResponse {
    let prefs = state.notebook.voice_prefs(&state.dash.config().voice)?;
    json_response(&VoiceResponse {
        preferred_voice: prefs.preferred_voice,
        use_remote: prefs.use_remote,
    })
}

// ---------------------------------------------------------------------------
// Communications
// ---------------------------------------------------------------------------

/// `GET /api/emails?category=all&q=...`: the filtered inbox with badge
/// counts. A `q` phrase reloads the inbox with that search.
pub fn get_emails(state: &mut WebState, url: &str) -> ApiResponse {
    if !state.dash.config().features.email_integration {
        return Ok(error_response(403, "email integration is disabled"));
    }
    let filter: CategoryFilter = match query_param(url, "category") {
        Some(raw) => match raw.parse() {
            Ok(filter) => filter,
            Err(err) => return Ok(error_response(400, &format!("{err:#}"))),
        },
        None => CategoryFilter::All,
    };

    match query_param(url, "q") {
        Some(phrase) => {
            state.dash.search_inbox(Some(&phrase));
            state.dash.settle(SETTLE_TIMEOUT);
        }
        None => ensure_inbox(state),
    }

    state.dash.comms_mut().set_filter(filter);
    let comms = state.dash.comms();
    json_response(&InboxResponse {
        emails: comms.visible_emails().collect(),
        badges: comms.badge_counts(),
        unread: comms.unread_count(),
    })
}

/// `POST /api/emails/escalate`: `{ "email_id": "...", "notes": "..." }`.
pub fn post_escalate(state: &mut WebState, body: &str) -> ApiResponse {
    let req: EscalateBody = parse_body(body, "escalate")?;
    ensure_inbox(state);
    match state.dash.comms().escalate(&req.email_id, &req.notes) {
        Ok(()) => json_response(&serde_json::json!({ "escalated": req.email_id })),
        Err(err) => Ok(error_response(404, &format!("{err:#}"))),
    }
}

/// `GET /api/drafts`: drafts awaiting review.
pub fn get_drafts(state: &mut WebState) -> ApiResponse {
    ensure_inbox(state);
    json_response(&state.dash.comms().drafts())
}

/// `POST /api/drafts/approve`: `{ "id": "...", "to": "a@x.com, b@x.com",
/// "confirmed": true }`.
///
/// An unknown draft answers 404 and an empty recipient list 400; nothing was
/// sent in either case. A send the backend refused answers 502 with the
/// acknowledgment the browser must show.
pub fn post_approve(state: &mut WebState, body: &str) -> ApiResponse {
    let req: ApproveBody = parse_body(body, "approve")?;
    ensure_inbox(state);
    let mut prompt = BrowserPrompt {
        confirmed: req.confirmed,
        messages: Vec::new(),
    };
    match state.dash.approve_draft(&mut prompt, &req.id, req.to.as_deref()) {
        Ok(decision) => json_response(&serde_json::json!({
            "decision": decision,
            "remaining": state.dash.comms().drafts().len(),
        })),
        Err(err @ DraftError::NotFound(_)) => Ok(error_response(404, &err.to_string())),
        Err(err @ DraftError::NoRecipients(_)) => Ok(error_response(400, &err.to_string())),
        Err(err) => {
            let message = format!("Failed to send email: {:#}", anyhow::Error::from(err));
            prompt.acknowledge(&message);
            send_failed_response(&message, prompt.messages)
        }
    }
}

fn send_failed_response(message: &str, acknowledgments: Vec<String>) -> ApiResponse {
    let body = serde_json::json!({
        "error": message,
        "sent": false,
        "acknowledgments": acknowledgments,
    });
    Ok(Response::from_data(body.to_string().into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(502)))
}

/// `POST /api/drafts/reject`: `{ "id": "...", "confirmed": true }`.
pub fn post_reject(state: &mut WebState, body: &str) -> ApiResponse {
    let req: RejectBody = parse_body(body, "reject")?;
    ensure_inbox(state);
    let mut prompt = BrowserPrompt {
        confirmed: req.confirmed,
        messages: Vec::new(),
    };
    match state.dash.comms_mut().reject_draft(&mut prompt, &req.id) {
        Ok(decision) => json_response(&serde_json::json!({
            "decision": decision,
            "remaining": state.dash.comms().drafts().len(),
        })),
        Err(err) => Ok(error_response(404, &format!("{err:#}"))),
    }
}

/// `GET /api/calendar?timeframe=today|week|month`.
pub fn get_calendar(state: &mut WebState, url: &str) -> ApiResponse {
    if !state.dash.config().features.calendar_integration {
        return Ok(error_response(403, "calendar integration is disabled"));
    }
    let timeframe: Timeframe = match query_param(url, "timeframe") {
        Some(raw) => match raw.parse() {
            Ok(timeframe) => timeframe,
            Err(err) => return Ok(error_response(400, &format!("{err:#}"))),
        },
        None => Timeframe::Today,
    };
    state.dash.load_calendar(timeframe);
    state.dash.settle(SETTLE_TIMEOUT);
    json_response(&state.dash.comms().calendar())
}

// ---------------------------------------------------------------------------
// Analytics and configuration
// ---------------------------------------------------------------------------

/// `GET /api/stats?days=N`: event log summary.
pub fn get_stats(state: &mut WebState, url: &str) -> ApiResponse {
    let log = EventLog::from_config(&state.dash.config().logging);
    let stats = reporter::compute_stats(&log, parse_days_param(url));
    json_response(&stats)
}

/// `GET /api/config`: current effective configuration.
pub fn get_config() -> ApiResponse {
    let cfg = config::load();
    let toml_text = toml::to_string_pretty(&cfg).unwrap_or_default();
    json_response(&ConfigResponse {
        config: cfg,
        toml_text,
    })
}

/// `PUT /api/config`: update configuration keys.
///
/// Expects JSON body: `{ "updates": [{ "key": "features.voice", "value": "false" }] }`.
/// Changes apply the next time the server starts.
pub fn put_config(body: &str) -> ApiResponse {
    let req: ConfigUpdateRequest = parse_body(body, "config update")?;

    let mut errors: Vec<String> = Vec::new();
    let mut applied: Vec<String> = Vec::new();
    for kv in &req.updates {
        match config::set_config_value(&kv.key, &kv.value) {
            Ok(()) => applied.push(format!("{} = {}", kv.key, kv.value)),
            Err(e) => errors.push(format!("{}: {}", kv.key, e)),
        }
    }

    json_response(&serde_json::json!({
        "applied": applied,
        "errors": errors,
        "success": errors.is_empty(),
    }))
}

/// `POST /api/config/reset`: reset config to defaults.
pub fn post_config_reset() -> ApiResponse {
    config::reset_config().context("failed to reset config")?;
    json_response(&serde_json::json!({
        "success": true,
        "message": "Configuration reset to defaults",
    }))
}

/// `GET /api/health`.
pub fn get_health(state: &mut WebState) -> ApiResponse {
    let (backend_reachable, backend_detail) = match state.dash.backend().overview() {
        Ok(_) => (true, format!("reachable at {}", state.dash.config().api.base_url)),
        Err(err) => (false, format!("{} ({})", err, err.category())),
    };
    let log_exists = EventLog::from_config(&state.dash.config().logging)
        .path()
        .is_some_and(|p| p.exists());

    json_response(&HealthResponse {
        backend_reachable,
        backend_detail,
        config_exists: config::global_config_file().is_some_and(|p| p.exists()),
        log_exists,
        in_flight: state.dash.in_flight(),
        live_charts: state.dash.charts().live_total(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
