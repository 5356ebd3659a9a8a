//! Tab orchestration.
//!
//! [`TabController`] owns which tab is active, the visibility of every tab
//! panel, and the [`ActiveContext`] the assistant answers against. Loads are
//! dispatched as [`LoadTicket`]s: the caller performs the fetch and hands the
//! ticket back with the result, and only a ticket for the still-active tab
//! may change the context.

pub mod refresh;

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::normalize::{LoadIssue, Normalized, Section, StockQuote, TabPayload};

pub use refresh::RefreshSchedule;

// ---------------------------------------------------------------------------
// Tab identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabId {
    #[default]
    Overview,
    Email,
    Calendar,
    Personal,
    Orders,
    Compliance,
    Reimbursement,
    Costs,
    Lab,
    Regional,
    Forecasting,
    Market,
    Milestones,
}

impl TabId {
    /// Every tab in navigation order.
    pub const ALL: [TabId; 13] = [
        TabId::Overview,
        TabId::Email,
        TabId::Calendar,
        TabId::Personal,
        TabId::Orders,
        TabId::Compliance,
        TabId::Reimbursement,
        TabId::Costs,
        TabId::Lab,
        TabId::Regional,
        TabId::Forecasting,
        TabId::Market,
        TabId::Milestones,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Email => "email",
            Self::Calendar => "calendar",
            Self::Personal => "personal",
            Self::Orders => "orders",
            Self::Compliance => "compliance",
            Self::Reimbursement => "reimbursement",
            Self::Costs => "costs",
            Self::Lab => "lab",
            Self::Regional => "regional",
            Self::Forecasting => "forecasting",
            Self::Market => "market",
            Self::Milestones => "milestones",
        }
    }

    /// Display name used in the assistant context header.
    pub fn label(self) -> &'static str {
        match self {
            Self::Overview => "Dashboard",
            Self::Email => "Communications",
            Self::Calendar => "Calendar",
            Self::Personal => "Personal",
            Self::Orders => "Orders",
            Self::Compliance => "Compliance",
            Self::Reimbursement => "Reimbursement",
            Self::Costs => "Costs",
            Self::Lab => "Lab",
            Self::Regional => "Regional",
            Self::Forecasting => "Forecast",
            Self::Market => "Market",
            Self::Milestones => "Projects",
        }
    }

    /// Backend section loaded each time this tab is switched to.
    ///
    /// The overview is loaded at startup and on the refresh timer instead,
    /// and the communication tabs are fed by their own collaborator.
    pub fn loader(self) -> Option<Section> {
        match self {
            Self::Orders => Some(Section::Orders),
            Self::Compliance => Some(Section::Compliance),
            Self::Reimbursement => Some(Section::Reimbursement),
            Self::Costs => Some(Section::Costs),
            Self::Lab => Some(Section::Lab),
            Self::Regional => Some(Section::Regional),
            Self::Forecasting => Some(Section::Forecasting),
            Self::Market => Some(Section::Market),
            Self::Milestones => Some(Section::Milestones),
            Self::Overview | Self::Email | Self::Calendar | Self::Personal => None,
        }
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown tab '{0}'")]
pub struct UnknownTab(pub String);

impl FromStr for TabId {
    type Err = UnknownTab;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TabId::ALL
            .into_iter()
            .find(|tab| tab.as_str() == wanted)
            .ok_or_else(|| UnknownTab(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Active context
// ---------------------------------------------------------------------------

/// The active tab and the last payload loaded for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActiveContext {
    pub tab: TabId,
    pub payload: Option<TabPayload>,
    /// Set when the payload is fallback data.
    pub issue: Option<LoadIssue>,
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// Visibility of one tab's content panel and its navigation indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PanelState {
    pub visible: bool,
    pub indicator_active: bool,
}

/// Content panels for every tab. Exactly one is visible at a time.
#[derive(Debug, Clone)]
pub struct PanelSet {
    panels: Vec<(TabId, PanelState)>,
}

impl PanelSet {
    fn new(initial: TabId) -> Self {
        let mut set = Self {
            panels: TabId::ALL
                .into_iter()
                .map(|tab| (tab, PanelState::default()))
                .collect(),
        };
        set.show(initial);
        set
    }

    /// Hide every panel, then reveal `tab` and mark its indicator.
    fn show(&mut self, tab: TabId) {
        for (id, state) in &mut self.panels {
            let active = *id == tab;
            state.visible = active;
            state.indicator_active = active;
        }
    }

    pub fn state(&self, tab: TabId) -> PanelState {
        self.panels
            .iter()
            .find(|(id, _)| *id == tab)
            .map(|(_, state)| *state)
            .unwrap_or_default()
    }

    pub fn visible_count(&self) -> usize {
        self.panels.iter().filter(|(_, s)| s.visible).count()
    }

    pub fn active_indicator_count(&self) -> usize {
        self.panels.iter().filter(|(_, s)| s.indicator_active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TabId, PanelState)> + '_ {
        self.panels.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// Load tickets
// ---------------------------------------------------------------------------

/// A dispatched load. Carries the tab that was active when it was issued.
///
/// Tickets can only be created by the controller and are consumed on commit.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    tab: TabId,
    section: Option<Section>,
    seq: u64,
}

impl LoadTicket {
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Backend section to fetch, or `None` for collaborator-fed tabs.
    pub fn section(&self) -> Option<Section> {
        self.section
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What a commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The payload is now the active context.
    Applied,
    /// Cached for its tab, but another tab is active.
    Stale,
    /// A stock quote; updates the ticker only.
    Ticker,
}

type ActivationListener = Box<dyn FnMut(TabId) + Send>;

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct TabController {
    context: ActiveContext,
    panels: PanelSet,
    cache: HashMap<TabId, (TabPayload, Option<LoadIssue>)>,
    stock: Option<StockQuote>,
    next_seq: u64,
    listeners: Vec<ActivationListener>,
}

impl Default for TabController {
    fn default() -> Self {
        Self::new()
    }
}

impl TabController {
    pub fn new() -> Self {
        Self {
            context: ActiveContext::default(),
            panels: PanelSet::new(TabId::default()),
            cache: HashMap::new(),
            stock: None,
            next_seq: 0,
            listeners: Vec::new(),
        }
    }

    pub fn active_tab(&self) -> TabId {
        self.context.tab
    }

    pub fn active_context(&self) -> &ActiveContext {
        &self.context
    }

    pub fn panels(&self) -> &PanelSet {
        &self.panels
    }

    /// Last stock quote received, if any.
    pub fn stock(&self) -> Option<&StockQuote> {
        self.stock.as_ref()
    }

    /// Register a callback fired after every switch, including repeated
    /// switches to the already-active tab.
    pub fn on_activate(&mut self, listener: impl FnMut(TabId) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Make `tab` active and return the load to dispatch for it, if any.
    ///
    /// Switching to the active tab again is allowed and re-issues its load.
    /// The context immediately shows the last payload cached for `tab`.
    pub fn switch_tab(&mut self, tab: TabId) -> Option<LoadTicket> {
        self.panels.show(tab);

        let (payload, issue) = match self.cache.get(&tab) {
            Some((payload, issue)) => (Some(payload.clone()), issue.clone()),
            None => (None, None),
        };
        self.context = ActiveContext {
            tab,
            payload,
            issue,
        };

        for listener in &mut self.listeners {
            listener(tab);
        }

        let ticket = tab.loader().map(|section| self.issue(tab, Some(section)));
        debug!(%tab, ticket = ticket.as_ref().map(|t| t.seq), "switched tab");
        ticket
    }

    /// Ticket for a load performed outside the tab's own loader (the inbox,
    /// for instance).
    pub fn ticket_for(&mut self, tab: TabId) -> LoadTicket {
        self.issue(tab, None)
    }

    /// Overview and stock loads, issued at startup and on every refresh tick
    /// regardless of the active tab.
    pub fn refresh_tickets(&mut self) -> [LoadTicket; 2] {
        [
            self.issue(TabId::Overview, Some(Section::Overview)),
            self.issue(TabId::Overview, Some(Section::Stock)),
        ]
    }

    /// Re-issue the load for the active tab (the inline retry action).
    pub fn retry(&mut self) -> Option<LoadTicket> {
        let tab = self.context.tab;
        match tab {
            TabId::Overview => Some(self.issue(tab, Some(Section::Overview))),
            _ => tab.loader().map(|section| self.issue(tab, Some(section))),
        }
    }

    fn issue(&mut self, tab: TabId, section: Option<Section>) -> LoadTicket {
        self.next_seq += 1;
        LoadTicket {
            tab,
            section,
            seq: self.next_seq,
        }
    }

    /// Deliver a completed load.
    ///
    /// The payload is cached for the ticket's tab. It becomes the active
    /// context only if that tab is still active.
    pub fn commit(&mut self, ticket: LoadTicket, result: Normalized) -> CommitOutcome {
        self.commit_payload(ticket, result.payload, result.issue)
    }

    pub fn commit_payload(
        &mut self,
        ticket: LoadTicket,
        payload: TabPayload,
        issue: Option<LoadIssue>,
    ) -> CommitOutcome {
        if let TabPayload::Stock(quote) = payload {
            self.stock = Some(quote);
            return CommitOutcome::Ticker;
        }

        self.cache
            .insert(ticket.tab, (payload.clone(), issue.clone()));

        if ticket.tab != self.context.tab {
            debug!(
                ticket_tab = %ticket.tab,
                active = %self.context.tab,
                seq = ticket.seq,
                "discarding stale load"
            );
            return CommitOutcome::Stale;
        }

        self.context.payload = Some(payload);
        self.context.issue = issue;
        CommitOutcome::Applied
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Section, fallback_payload};
    use std::sync::{Arc, Mutex};

    #[test]
    fn tab_ids_round_trip_through_strings() {
        for tab in TabId::ALL {
            assert_eq!(tab.as_str().parse::<TabId>().unwrap(), tab);
        }
        assert_eq!(" Orders ".parse::<TabId>().unwrap(), TabId::Orders);
        assert!("payroll".parse::<TabId>().is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(TabId::Overview.label(), "Dashboard");
        assert_eq!(TabId::Forecasting.label(), "Forecast");
        assert_eq!(TabId::Milestones.label(), "Projects");
    }

    #[test]
    fn overview_has_no_switch_loader() {
        let mut tabs = TabController::new();
        tabs.switch_tab(TabId::Orders);
        assert!(tabs.switch_tab(TabId::Overview).is_none());
        assert!(tabs.switch_tab(TabId::Email).is_none());
    }

    #[test]
    fn switching_same_tab_reissues_load() {
        let mut tabs = TabController::new();
        let first = tabs.switch_tab(TabId::Lab).unwrap();
        let second = tabs.switch_tab(TabId::Lab).unwrap();
        assert_eq!(first.section(), Some(Section::Lab));
        assert!(second.seq() > first.seq());
    }

    #[test]
    fn commit_applies_for_active_tab() {
        let mut tabs = TabController::new();
        let ticket = tabs.switch_tab(TabId::Orders).unwrap();
        let outcome = tabs.commit_payload(ticket, fallback_payload(Section::Orders), None);
        assert_eq!(outcome, CommitOutcome::Applied);
        assert!(matches!(
            tabs.active_context().payload,
            Some(TabPayload::Orders(_))
        ));
    }

    #[test]
    fn cached_payload_shown_on_return() {
        let mut tabs = TabController::new();
        let ticket = tabs.switch_tab(TabId::Costs).unwrap();
        tabs.commit_payload(ticket, fallback_payload(Section::Costs), None);
        tabs.switch_tab(TabId::Lab);
        assert!(tabs.active_context().payload.is_none());
        tabs.switch_tab(TabId::Costs);
        assert!(matches!(
            tabs.active_context().payload,
            Some(TabPayload::Costs(_))
        ));
    }

    #[test]
    fn stock_updates_ticker_not_context() {
        let mut tabs = TabController::new();
        let [overview, stock] = tabs.refresh_tickets();
        assert_eq!(
            tabs.commit_payload(stock, fallback_payload(Section::Stock), None),
            CommitOutcome::Ticker
        );
        assert!(tabs.active_context().payload.is_none());
        assert!(tabs.stock().is_some());
        assert_eq!(
            tabs.commit_payload(overview, fallback_payload(Section::Overview), None),
            CommitOutcome::Applied
        );
    }

    #[test]
    fn listeners_fire_on_every_switch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut tabs = TabController::new();
        tabs.on_activate(move |tab| sink.lock().unwrap().push(tab));
        tabs.switch_tab(TabId::Email);
        tabs.switch_tab(TabId::Email);
        tabs.switch_tab(TabId::Market);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TabId::Email, TabId::Email, TabId::Market]
        );
    }

    #[test]
    fn retry_targets_active_tab() {
        let mut tabs = TabController::new();
        assert_eq!(tabs.retry().unwrap().section(), Some(Section::Overview));
        tabs.switch_tab(TabId::Regional);
        assert_eq!(tabs.retry().unwrap().section(), Some(Section::Regional));
        tabs.switch_tab(TabId::Personal);
        assert!(tabs.retry().is_none());
    }
}
