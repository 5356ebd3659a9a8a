//! Payload normalization.
//!
//! Every dashboard tab reads one section of the backend overview. The backend
//! has shipped several shapes for those sections over time, and it may be
//! down entirely. [`normalize`] hides both facts: it always returns a
//! canonical [`TabPayload`], substituting the built-in fallback section when
//! the backend response is unusable, and reports what went wrong as a
//! [`LoadIssue`] for the inline error indicator.

pub mod fallback;
pub mod kpis;
pub mod model;
pub mod raw;
pub mod rules;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ErrorCategory, FetchError, http::envelope_data};
use crate::comms::EmailDigest;

pub use kpis::OverviewKpis;
pub use model::*;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A backend data section, addressed by the overview key it lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// The whole overview payload.
    Overview,
    Orders,
    Compliance,
    Reimbursement,
    Costs,
    Lab,
    Regional,
    Forecasting,
    Market,
    Milestones,
    /// The stock tile, served by its own endpoint.
    Stock,
}

impl Section {
    /// Key of this section inside the overview `data` object.
    pub fn overview_key(self) -> Option<&'static str> {
        match self {
            Self::Overview => None,
            Self::Orders => Some("order_volume"),
            Self::Compliance => Some("compliance"),
            Self::Reimbursement => Some("reimbursement"),
            Self::Costs => Some("operating_costs"),
            Self::Lab => Some("lab_metrics"),
            Self::Regional => Some("regional"),
            Self::Forecasting => Some("forecasting"),
            Self::Market => Some("market_intelligence"),
            Self::Milestones => Some("milestones"),
            Self::Stock => Some("stock"),
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overview => write!(f, "overview"),
            Self::Orders => write!(f, "orders"),
            Self::Compliance => write!(f, "compliance"),
            Self::Reimbursement => write!(f, "reimbursement"),
            Self::Costs => write!(f, "costs"),
            Self::Lab => write!(f, "lab"),
            Self::Regional => write!(f, "regional"),
            Self::Forecasting => write!(f, "forecasting"),
            Self::Market => write!(f, "market"),
            Self::Milestones => write!(f, "milestones"),
            Self::Stock => write!(f, "stock"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Canonical data for one tab.
///
/// Serializes as the bare section object, which is what the assistant sends
/// as `tab_data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TabPayload {
    Overview(Box<Overview>),
    Orders(OrderVolume),
    Compliance(Compliance),
    Reimbursement(Reimbursement),
    Costs(OperatingCosts),
    Lab(LabMetrics),
    Regional(Regional),
    Forecasting(Forecasting),
    Market(MarketIntelligence),
    Milestones(Milestones),
    Stock(StockQuote),
    Email(EmailDigest),
}

impl TabPayload {
    /// Backend section this payload came from. `None` for the inbox.
    pub fn section(&self) -> Option<Section> {
        Some(match self {
            Self::Overview(_) => Section::Overview,
            Self::Orders(_) => Section::Orders,
            Self::Compliance(_) => Section::Compliance,
            Self::Reimbursement(_) => Section::Reimbursement,
            Self::Costs(_) => Section::Costs,
            Self::Lab(_) => Section::Lab,
            Self::Regional(_) => Section::Regional,
            Self::Forecasting(_) => Section::Forecasting,
            Self::Market(_) => Section::Market,
            Self::Milestones(_) => Section::Milestones,
            Self::Stock(_) => Section::Stock,
            Self::Email(_) => return None,
        })
    }

    /// JSON form for the `tab_data` field of an assistant request.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Where a normalized payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Backend,
    Fallback,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend => write!(f, "backend"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Non-blocking load failure shown inline with a retry action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadIssue {
    /// Backend section that failed. `None` for loads outside the overview
    /// feed, such as the inbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    pub category: ErrorCategory,
    pub message: String,
    pub retryable: bool,
}

impl LoadIssue {
    pub fn from_error(section: Option<Section>, error: &FetchError) -> Self {
        let category = error.category();
        Self {
            section,
            category,
            message: error.to_string(),
            retryable: category != ErrorCategory::Malformed,
        }
    }
}

/// Result of normalizing one backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub payload: TabPayload,
    pub source: DataSource,
    pub issue: Option<LoadIssue>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Turn a raw `{success, data}` response for `section` into a canonical
/// payload.
///
/// Transport errors, `success != true`, non-JSON bodies and sections that do
/// not deserialize all produce the fallback payload for the same section.
pub fn normalize(section: Section, raw: Result<Value, FetchError>) -> Normalized {
    match raw.and_then(envelope_data).and_then(|data| from_data(section, data)) {
        Ok(payload) => {
            debug!(%section, "normalized backend payload");
            Normalized {
                payload,
                source: DataSource::Backend,
                issue: None,
            }
        }
        Err(error) => {
            warn!(%section, category = %error.category(), error = %error, "using fallback data");
            Normalized {
                payload: fallback_payload(section),
                source: DataSource::Fallback,
                issue: Some(LoadIssue::from_error(Some(section), &error)),
            }
        }
    }
}

/// Normalize an already-unwrapped `data` object for `section`.
///
/// For the stock section `data` is the tile itself, not an overview.
pub fn from_data(section: Section, data: Value) -> Result<TabPayload, FetchError> {
    let data = match (section, section.overview_key()) {
        (Section::Overview | Section::Stock, _) | (_, None) => data,
        (_, Some(key)) => match data {
            Value::Object(mut map) => map.remove(key).ok_or_else(|| {
                FetchError::Malformed(format!("overview has no '{key}' section"))
            })?,
            _ => return Err(FetchError::Malformed("overview data is not an object".into())),
        },
    };

    if !data.is_object() {
        return Err(FetchError::Malformed(format!(
            "'{section}' section is not an object"
        )));
    }

    Ok(match section {
        Section::Overview => TabPayload::Overview(Box::new(rules::overview(decode(data)?))),
        Section::Orders => TabPayload::Orders(rules::orders(decode(data)?)),
        Section::Compliance => TabPayload::Compliance(rules::compliance(decode(data)?)),
        Section::Reimbursement => {
            TabPayload::Reimbursement(rules::reimbursement(decode(data)?, None))
        }
        Section::Costs => TabPayload::Costs(rules::costs(decode(data)?)),
        Section::Lab => TabPayload::Lab(rules::lab(decode(data)?)),
        Section::Regional => TabPayload::Regional(rules::regional(decode(data)?)),
        Section::Forecasting => TabPayload::Forecasting(rules::forecasting(decode(data)?)),
        Section::Market => TabPayload::Market(rules::market(decode(data)?)),
        Section::Milestones => TabPayload::Milestones(rules::milestones(decode(data)?)),
        Section::Stock => TabPayload::Stock(rules::stock(Some(decode(data)?))),
    })
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, FetchError> {
    serde_json::from_value(data).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Run an already-canonical payload through the rules again.
///
/// Used by consumers that receive a payload over the wire. For any payload
/// produced by [`normalize`] the result equals the input.
pub fn renormalize(payload: &TabPayload) -> TabPayload {
    let Some(section) = payload.section() else {
        return payload.clone();
    };
    let data = payload.to_value();
    let wrapped = match section.overview_key() {
        Some(key) if section != Section::Stock => serde_json::json!({ key: data }),
        _ => data,
    };
    from_data(section, wrapped).unwrap_or_else(|_| payload.clone())
}

/// The fallback payload for one section.
pub fn fallback_payload(section: Section) -> TabPayload {
    let data = fallback::overview();
    match section {
        Section::Overview => TabPayload::Overview(Box::new(data.clone())),
        Section::Orders => TabPayload::Orders(data.order_volume.clone()),
        Section::Compliance => TabPayload::Compliance(data.compliance.clone()),
        Section::Reimbursement => TabPayload::Reimbursement(data.reimbursement.clone()),
        Section::Costs => TabPayload::Costs(data.operating_costs.clone()),
        Section::Lab => TabPayload::Lab(data.lab_metrics.clone()),
        Section::Regional => TabPayload::Regional(data.regional.clone()),
        Section::Forecasting => TabPayload::Forecasting(data.forecasting.clone()),
        Section::Market => TabPayload::Market(data.market_intelligence.clone()),
        Section::Milestones => TabPayload::Milestones(data.milestones.clone()),
        Section::Stock => TabPayload::Stock(data.stock.clone()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_false_substitutes_fallback() {
        let out = normalize(Section::Orders, Ok(json!({"success": false})));
        assert_eq!(out.source, DataSource::Fallback);
        assert_eq!(out.issue.unwrap().category, ErrorCategory::Unsuccessful);
        assert!(matches!(out.payload, TabPayload::Orders(ref o) if o.monthly_orders > 0.0));
    }

    #[test]
    fn transport_error_substitutes_fallback() {
        let out = normalize(
            Section::Lab,
            Err(FetchError::Transport("connection refused".into())),
        );
        let issue = out.issue.unwrap();
        assert!(issue.retryable);
        assert_eq!(issue.section, Some(Section::Lab));
        assert!(matches!(out.payload, TabPayload::Lab(_)));
    }

    #[test]
    fn missing_section_is_malformed() {
        let out = normalize(
            Section::Regional,
            Ok(json!({"success": true, "data": {"order_volume": {}}})),
        );
        let issue = out.issue.unwrap();
        assert_eq!(issue.category, ErrorCategory::Malformed);
        assert!(!issue.retryable);
    }

    #[test]
    fn section_with_wrong_types_is_malformed() {
        let out = normalize(
            Section::Orders,
            Ok(json!({"success": true, "data": {"order_volume": {"trend_data": "soon"}}})),
        );
        assert_eq!(out.source, DataSource::Fallback);
    }

    #[test]
    fn live_section_is_normalized() {
        let out = normalize(
            Section::Costs,
            Ok(json!({"success": true, "data": {"operating_costs": {"total_monthly_costs": 9}}})),
        );
        assert_eq!(out.source, DataSource::Backend);
        assert!(out.issue.is_none());
        match out.payload {
            TabPayload::Costs(c) => assert_eq!(c.total_operating_costs, 9.0),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn stock_tile_is_not_nested() {
        let out = normalize(
            Section::Stock,
            Ok(json!({"success": true, "data": {"current_price": {"price": 50, "change": -1, "change_percentage": "-1.96"}}})),
        );
        match out.payload {
            TabPayload::Stock(q) => assert_eq!(q.current_price.change_percentage, "-1.96"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn payload_serializes_as_bare_section() {
        let payload = fallback_payload(Section::Orders);
        let value = payload.to_value();
        assert!(value.get("trend_data").is_some());
        assert!(value.get("Orders").is_none());
    }

    #[test]
    fn renormalize_is_identity_for_every_section() {
        for section in [
            Section::Overview,
            Section::Orders,
            Section::Compliance,
            Section::Reimbursement,
            Section::Costs,
            Section::Lab,
            Section::Regional,
            Section::Forecasting,
            Section::Market,
            Section::Milestones,
            Section::Stock,
        ] {
            let payload = fallback_payload(section);
            assert_eq!(renormalize(&payload), payload, "section {section}");
        }
    }
}
