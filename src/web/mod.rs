//! JSON API over the dashboard state.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that a browser front
//! end drives: tab switches, assistant questions, notes, reminders, inbox
//! and drafts, plus stats and config management.
//!
//! Launched via `execdash serve` (default: `http://127.0.0.1:9747`).

mod api;

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::analytics::EventLog;
use crate::api::HttpBackend;
use crate::assistant::LoggingSpeech;
use crate::charts::TerminalBackend;
use crate::config::DashboardConfig;
use crate::runtime::Dashboard;
use crate::storage::{FileStore, Notebook};

/// Everything a request handler can touch. Owned by the server loop.
pub(crate) struct WebState {
    pub dash: Dashboard<TerminalBackend>,
    pub notebook: Notebook<FileStore>,
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the API server on the given address.
///
/// Blocks the current thread. Requests are handled one at a time on the
/// thread that owns the dashboard, between turns of its event loop, so the
/// periodic refresh keeps running while the server is idle.
pub fn serve(config: &DashboardConfig, addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    let log = EventLog::from_config(&config.logging);
    let notebook = Notebook::new(FileStore::open_default()?, config.notes.clone());
    let prefs = notebook.voice_prefs(&config.voice)?;
    let dash = Dashboard::new(
        config.clone(),
        Arc::new(HttpBackend::from_config(&config.api)),
        TerminalBackend::new(),
        log.clone(),
    )
    .with_speech(LoggingSpeech::new(log), prefs);

    let mut state = WebState { dash, notebook };
    state.dash.start(Instant::now());

    println!("execdash API running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");
    info!(addr, "serving");

    loop {
        state.dash.pump(Duration::ZERO);
        let wait = state
            .dash
            .next_wakeup(Instant::now(), Duration::from_millis(250));

        let mut request = match server.recv_timeout(wait) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch | Method::Delete) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let response = match dispatch(&mut state, &method, &url, body.as_deref()) {
            Ok(resp) => resp,
            Err(e) => error_response(500, &format!("{e:#}")),
        };
        let _ = request.respond(response);

        debug!(%method, url, "handled request");
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn dispatch(
    state: &mut WebState,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = url.split('?').next().unwrap_or(url);
    let body = body.unwrap_or("{}");

    match (method, path) {
        // Dashboard
        (&Method::Get, "/api/context") => api::get_context(state),
        (&Method::Post, "/api/tab") => api::post_tab(state, body),
        (&Method::Post, "/api/retry") => api::post_retry(state),
        (&Method::Get, "/api/charts") => api::get_charts(state),
        (&Method::Get, "/api/stock") => api::get_stock(state),

        // Assistant
        (&Method::Post, "/api/ask") => api::post_ask(state, body),
        (&Method::Get, "/api/transcript") => api::get_transcript(state),

        // Personal
        (&Method::Get, "/api/notes") => api::get_notes(state, url),
        (&Method::Post, "/api/notes") => api::post_note(state, url, body),
        (&Method::Delete, "/api/notes") => api::delete_note(state, url),
        (&Method::Get, "/api/reminders") => api::get_reminders(state),
        (&Method::Post, "/api/reminders") => api::post_reminder(state, body),
        (&Method::Post, "/api/reminders/toggle") => api::toggle_reminder(state, url),
        (&Method::Delete, "/api/reminders") => api::delete_reminder(state, url),
        (&Method::Get, "/api/voice") => api::get_voice(state),
        (&Method::Put, "/api/voice") => api::put_voice(state, body),

        // Communications
        (&Method::Get, "/api/emails") => api::get_emails(state, url),
        (&Method::Post, "/api/emails/escalate") => api::post_escalate(state, body),
        (&Method::Get, "/api/drafts") => api::get_drafts(state),
        (&Method::Post, "/api/drafts/approve") => api::post_approve(state, body),
        (&Method::Post, "/api/drafts/reject") => api::post_reject(state, body),
        (&Method::Get, "/api/calendar") => api::get_calendar(state, url),

        // Analytics and configuration
        (&Method::Get, "/api/stats") => api::get_stats(state, url),
        (&Method::Get, "/api/config") => api::get_config(),
        (&Method::Put, "/api/config") => api::put_config(body),
        (&Method::Post, "/api/config/reset") => api::post_config_reset(),
        (&Method::Get, "/api/health") => api::get_health(state),

        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub(crate) fn error_response(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header must be valid")
}
