//! Built-in dataset substituted when the backend cannot supply a tab.
//!
//! The dataset is stored in raw backend form and run through the same rules
//! as live data, so it exercises the legacy-name paths too.

use std::sync::LazyLock;

use super::model::Overview;
use super::raw::RawOverview;
use super::rules;

const FALLBACK_JSON: &str = include_str!("fallback.json");

static FALLBACK: LazyLock<Overview> = LazyLock::new(|| {
    match serde_json::from_str::<RawOverview>(FALLBACK_JSON) {
        Ok(raw) => rules::overview(raw),
        Err(e) => {
            tracing::error!(error = %e, "built-in fallback dataset is unreadable");
            rules::overview(RawOverview::default())
        }
    }
});

/// The complete fallback overview.
pub fn overview() -> &'static Overview {
    &FALLBACK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_json_parses() {
        serde_json::from_str::<RawOverview>(FALLBACK_JSON).unwrap();
    }

    #[test]
    fn fallback_is_structurally_complete() {
        let data = overview();
        assert_eq!(data.order_volume.monthly_orders, 245_680.0);
        assert_eq!(data.order_volume.trend_data.len(), 6);
        assert_eq!(data.order_volume.by_category[0].count, 98_000.0);
        assert_eq!(data.compliance.top_return_reasons.len(), 4);
        assert_eq!(data.reimbursement.by_payer.len(), 4);
        assert_eq!(data.operating_costs.total_operating_costs, 32_450_000.0);
        assert_eq!(data.operating_costs.monthly_trend[5].total_cost, 32_450_000.0);
        assert_eq!(data.lab_metrics.average_turnaround_hours, 38.5);
        assert_eq!(data.regional.territories[0].orders, 65_432.0);
        assert_eq!(data.forecasting.quarterly_forecast.len(), 4);
        assert_eq!(data.market_intelligence.latest_news.len(), 3);
        assert_eq!(data.milestones.active_projects.len(), 3);
        assert_eq!(data.milestones.critical_items.len(), 2);
        assert_eq!(data.stock.market_cap, "$3.2B");
    }

    #[test]
    fn fallback_trend_growth_is_filled() {
        let trend = &overview().order_volume.trend_data;
        assert_eq!(trend[0].growth, 0.0);
        assert_eq!(trend[1].growth, 3.5);
    }
}
