/// Normalization tests.
///
/// Covers the path from a raw `{success, data}` response to the numbers the
/// overview cards display, including every way the backend can fail.
use execdash::api::{ErrorCategory, FetchError};
use execdash::config::schema::DisplayLimits;
use execdash::normalize::{
    DataSource, OverviewKpis, Section, TabPayload, fallback_payload, normalize,
};
use serde_json::json;

fn overview_kpis(payload: &TabPayload) -> OverviewKpis {
    match payload {
        TabPayload::Overview(data) => OverviewKpis::from_overview(data, &DisplayLimits::default()),
        other => panic!("expected overview payload, got {other:?}"),
    }
}

fn assert_all_finite(kpis: &OverviewKpis) {
    for value in [
        kpis.monthly_orders,
        kpis.orders_growth_mom,
        kpis.compliance_percentage,
        kpis.total_returns,
        kpis.reimbursement_percentage,
        kpis.claims_reimbursed,
        kpis.lab_tat_hours,
        kpis.lab_target_hours,
        kpis.operating_costs_millions,
        kpis.forecast_thousands,
    ] {
        assert!(value.is_finite(), "non-numeric KPI: {value}");
    }
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[test]
fn unsuccessful_overview_still_yields_numeric_kpis() {
    let out = normalize(Section::Overview, Ok(json!({ "success": false })));

    assert_eq!(out.source, DataSource::Fallback);
    let issue = out.issue.as_ref().expect("fallback carries an issue");
    assert_eq!(issue.category, ErrorCategory::Unsuccessful);
    assert!(issue.retryable);

    let kpis = overview_kpis(&out.payload);
    assert_all_finite(&kpis);
    assert!(kpis.monthly_orders > 0.0);
    assert!(kpis.alerts.len() <= DisplayLimits::default().critical_alerts);
}

#[test]
fn unreachable_backend_matches_fallback_payload() {
    for section in [Section::Orders, Section::Lab, Section::Milestones, Section::Stock] {
        let out = normalize(section, Err(FetchError::Transport("connection refused".into())));
        assert_eq!(out.source, DataSource::Fallback);
        assert_eq!(out.payload, fallback_payload(section));
        assert_eq!(out.issue.unwrap().category, ErrorCategory::Transport);
    }
}

#[test]
fn only_malformed_issues_are_not_retryable() {
    let not_json = normalize(
        Section::Costs,
        Err(FetchError::NotJson {
            content_type: "text/html".into(),
        }),
    );
    assert!(not_json.issue.unwrap().retryable);

    let malformed = normalize(Section::Costs, Ok(json!({ "success": true, "data": [] })));
    let issue = malformed.issue.unwrap();
    assert_eq!(issue.category, ErrorCategory::Malformed);
    assert!(!issue.retryable);
}

// ---------------------------------------------------------------------------
// Live data
// ---------------------------------------------------------------------------

#[test]
fn numeric_strings_and_missing_sections_normalize() {
    let out = normalize(
        Section::Overview,
        Ok(json!({
            "success": true,
            "data": { "order_volume": { "monthly_orders": "1200" } }
        })),
    );

    assert_eq!(out.source, DataSource::Backend);
    assert!(out.issue.is_none());
    let kpis = overview_kpis(&out.payload);
    assert_eq!(kpis.monthly_orders, 1200.0);
    assert_all_finite(&kpis);
}
