/// Configuration schema and defaults for the executive dashboard.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[api]`, `[api.endpoints]`, `[features]`, `[limits]`, `[notes]`, `[voice]`,
/// `[metrics.<id>]`, `[logging]` and `[server]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level dashboard configuration.
///
/// Maps directly to the `~/.execdash/config.toml` and `.execdash.toml` file
/// schemas. All sections and fields are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub features: FeatureFlags,
    pub limits: DisplayLimits,
    pub notes: NotesConfig,
    pub voice: VoiceConfig,
    pub metrics: BTreeMap<String, MetricDisplay>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            features: FeatureFlags::default(),
            limits: DisplayLimits::default(),
            notes: NotesConfig::default(),
            voice: VoiceConfig::default(),
            metrics: default_metrics(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Backend location and polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Interval between periodic overview/stock refreshes.
    pub refresh_interval_ms: u64,
    pub endpoints: Endpoints,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 10_000,
            refresh_interval_ms: 300_000,
            endpoints: Endpoints::default(),
        }
    }
}

/// Endpoint paths relative to `api.base_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub overview: String,
    pub stock: String,
    pub ask_tab: String,
    pub emails: String,
    pub inbox_summary: String,
    pub send_email: String,
    pub calendar_events: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            overview: "/api/dashboard/overview".to_string(),
            stock: "/api/dashboard/tiles/stock".to_string(),
            ask_tab: "/api/query/ask-tab".to_string(),
            emails: "/voice-agent/emails".to_string(),
            inbox_summary: "/voice-agent/inbox/summary".to_string(),
            send_email: "/voice-agent/email/send".to_string(),
            calendar_events: "/voice-agent/calendar/events".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [features]
// ---------------------------------------------------------------------------

/// Feature toggles. All on by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub ai_assistant: bool,
    pub ai_reasoning: bool,
    pub quick_notes: bool,
    pub stock_ticker: bool,
    pub email_integration: bool,
    pub calendar_integration: bool,
    pub personal_assistant: bool,
    pub auto_refresh: bool,
    pub voice: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ai_assistant: true,
            ai_reasoning: true,
            quick_notes: true,
            stock_ticker: true,
            email_integration: true,
            calendar_integration: true,
            personal_assistant: true,
            auto_refresh: true,
            voice: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [limits]
// ---------------------------------------------------------------------------

/// Maximum number of items rendered per list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayLimits {
    pub top_territories: usize,
    pub recent_projects: usize,
    pub critical_alerts: usize,
    pub market_news: usize,
    pub competitor_updates: usize,
    pub email_preview: usize,
    pub calendar_events: usize,
    pub quick_notes: usize,
    /// `max_results` sent with every inbox fetch.
    pub max_emails: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            top_territories: 5,
            recent_projects: 2,
            critical_alerts: 4,
            market_news: 4,
            competitor_updates: 4,
            email_preview: 3,
            calendar_events: 4,
            quick_notes: 3,
            max_emails: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// [notes]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Stored notes beyond this count are dropped, oldest first.
    pub max_notes: usize,
    pub display_notes: usize,
    pub max_reminders: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            max_notes: 10,
            display_notes: 3,
            max_reminders: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// [voice]
// ---------------------------------------------------------------------------

/// Speech settings for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Prefer the remote text-to-speech engine over the local synthesizer.
    pub use_remote_tts: bool,
    /// Local synthesizer voice name, if any.
    pub preferred_voice: Option<String>,
    /// Delay before listening resumes after an utterance ends.
    pub restart_delay_ms: u64,
    /// Delay before listening resumes after a recoverable recognition error.
    pub error_restart_delay_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            use_remote_tts: true,
            preferred_voice: None,
            restart_delay_ms: 500,
            error_restart_delay_ms: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// [metrics.<id>]
// ---------------------------------------------------------------------------

/// How a metric value is rendered as text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFormat {
    /// `250000` renders as `250K`.
    #[default]
    Thousands,
    /// `98.5` renders as `98.5%`.
    Percent,
    /// `38.5` renders as `38.5h`.
    Hours,
    /// `3500000` renders as `$3.5M`.
    MillionsUsd,
}

impl MetricFormat {
    /// Render a raw metric value in this format.
    pub fn render(self, value: f64) -> String {
        match self {
            Self::Thousands => format!("{}K", trim_decimal(value / 1000.0)),
            Self::Percent => format!("{}%", trim_decimal(value)),
            Self::Hours => format!("{}h", trim_decimal(value)),
            Self::MillionsUsd => format!("${}M", trim_decimal(value / 1_000_000.0)),
        }
    }
}

impl std::fmt::Display for MetricFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thousands => write!(f, "thousands"),
            Self::Percent => write!(f, "percent"),
            Self::Hours => write!(f, "hours"),
            Self::MillionsUsd => write!(f, "millions_usd"),
        }
    }
}

/// One decimal place, dropped when it is zero.
fn trim_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

/// Reference values for the day/week/month/quarter periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseValues {
    pub day: f64,
    pub week: f64,
    pub month: f64,
    pub quarter: f64,
}

impl BaseValues {
    pub fn as_array(&self) -> [f64; 4] {
        [self.day, self.week, self.month, self.quarter]
    }
}

/// Display parameters for one metric card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricDisplay {
    pub label: String,
    pub color: String,
    pub format: MetricFormat,
    pub base_values: BaseValues,
}

impl Default for MetricDisplay {
    fn default() -> Self {
        Self {
            label: String::new(),
            color: "#93C5FD".to_string(),
            format: MetricFormat::default(),
            base_values: BaseValues::default(),
        }
    }
}

fn metric(label: &str, color: &str, format: MetricFormat, values: [f64; 4]) -> MetricDisplay {
    MetricDisplay {
        label: label.to_string(),
        color: color.to_string(),
        format,
        base_values: BaseValues {
            day: values[0],
            week: values[1],
            month: values[2],
            quarter: values[3],
        },
    }
}

fn default_metrics() -> BTreeMap<String, MetricDisplay> {
    use MetricFormat::*;
    BTreeMap::from([
        (
            "orders".to_string(),
            metric(
                "Order Volume",
                "#93C5FD",
                Thousands,
                [1500.0, 35_000.0, 250_000.0, 750_000.0],
            ),
        ),
        (
            "reimbursement".to_string(),
            metric("Reimbursement", "#86EFAC", Percent, [97.0, 98.0, 99.0, 98.5]),
        ),
        (
            "compliance".to_string(),
            metric("Compliance", "#FCD34D", Percent, [99.2, 99.4, 99.3, 99.5]),
        ),
        (
            "lab".to_string(),
            metric("Lab TAT", "#C4B5FD", Hours, [38.0, 39.0, 40.0, 39.0]),
        ),
        (
            "costs".to_string(),
            metric(
                "Operating Costs",
                "#F9A8D4",
                MillionsUsd,
                [3_500_000.0, 24_500_000.0, 103_500_000.0, 310_500_000.0],
            ),
        ),
        (
            "forecast".to_string(),
            metric(
                "Forecast",
                "#67E8F9",
                Thousands,
                [45_000.0, 315_000.0, 1_350_000.0, 4_050_000.0],
            ),
        ),
    ])
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Event log and diagnostic verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append structured events to the JSONL log.
    pub enabled: bool,
    /// Event log path. Empty means `~/.execdash/events.jsonl`.
    pub path: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: String::new(),
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML
// ---------------------------------------------------------------------------

impl DashboardConfig {
    /// Annotated default configuration written by `execdash config init`.
    pub fn default_toml() -> String {
        let body = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!(
            "# execdash configuration\n\
             #\n\
             # Layers (lowest to highest precedence): built-in defaults,\n\
             # ~/.execdash/config.toml, ./.execdash.toml, EXECDASH_* env vars.\n\n{body}"
        )
    }

    /// Display parameters for a metric, falling back to an unlabeled default.
    pub fn metric(&self, id: &str) -> MetricDisplay {
        self.metrics.get(id).cloned().unwrap_or_else(|| MetricDisplay {
            label: id.to_string(),
            ..MetricDisplay::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_settings() {
        let config = DashboardConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.refresh_interval_ms, 300_000);
        assert_eq!(config.api.endpoints.ask_tab, "/api/query/ask-tab");
        assert_eq!(config.limits.top_territories, 5);
        assert_eq!(config.notes.max_notes, 10);
        assert_eq!(config.voice.restart_delay_ms, 500);
        assert_eq!(config.metrics.len(), 6);
        assert!(config.features.auto_refresh);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[api]
base_url = "http://dash.internal:9000"
"#;
        let config: DashboardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "http://dash.internal:9000");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.api.endpoints.overview, "/api/dashboard/overview");
        assert_eq!(config.metrics.len(), 6);
    }

    #[test]
    fn deserialize_metric_override() {
        let toml_str = r##"
[metrics.orders]
label = "Orders"
color = "#000000"
format = "thousands"

[metrics.orders.base_values]
day = 10.0
week = 20.0
month = 30.0
quarter = 40.0
"##;
        let config: DashboardConfig = toml::from_str(toml_str).unwrap();
        let orders = config.metric("orders");
        assert_eq!(orders.label, "Orders");
        assert_eq!(orders.base_values.as_array(), [10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: DashboardConfig = toml::from_str("").unwrap();
        assert!(config.features.ai_assistant);
        assert_eq!(config.server.addr, "127.0.0.1:9747");
    }

    #[test]
    fn default_toml_parses_back() {
        let toml_str = DashboardConfig::default_toml();
        let config: DashboardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.limits.max_emails, 50);
        assert_eq!(config.metric("lab").format, MetricFormat::Hours);
    }

    #[test]
    fn unknown_metric_gets_labeled_default() {
        let config = DashboardConfig::default();
        assert_eq!(config.metric("headcount").label, "headcount");
    }

    #[test]
    fn metric_format_render() {
        assert_eq!(MetricFormat::Thousands.render(250_000.0), "250K");
        assert_eq!(MetricFormat::Percent.render(98.5), "98.5%");
        assert_eq!(MetricFormat::Hours.render(38.0), "38h");
        assert_eq!(MetricFormat::MillionsUsd.render(3_500_000.0), "$3.5M");
    }

    #[test]
    fn metric_format_display() {
        assert_eq!(MetricFormat::MillionsUsd.to_string(), "millions_usd");
        assert_eq!(MetricFormat::Percent.to_string(), "percent");
    }
}
