/// Headline figures for the overview cards, derived from a normalized
/// overview. Alerts are milestone critical items followed by market critical
/// alerts, truncated to the configured limit.
use serde::Serialize;

use super::model::Overview;
use crate::config::schema::DisplayLimits;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewKpis {
    pub monthly_orders: f64,
    pub orders_growth_mom: f64,
    pub compliance_percentage: f64,
    pub total_returns: f64,
    pub reimbursement_percentage: f64,
    pub claims_reimbursed: f64,
    pub lab_tat_hours: f64,
    pub lab_target_hours: f64,
    pub operating_costs_millions: f64,
    pub forecast_thousands: f64,
    pub alerts: Vec<String>,
}

impl OverviewKpis {
    pub fn from_overview(data: &Overview, limits: &DisplayLimits) -> Self {
        let alerts = data
            .milestones
            .critical_items
            .iter()
            .chain(data.market_intelligence.critical_alerts.iter())
            .take(limits.critical_alerts)
            .cloned()
            .collect();

        Self {
            monthly_orders: data.order_volume.monthly_orders,
            orders_growth_mom: data.order_volume.growth_metrics.mom,
            compliance_percentage: 100.0 - data.compliance.overall_return_rate,
            total_returns: data.compliance.total_returns,
            reimbursement_percentage: data.reimbursement.reimbursement_percentage,
            claims_reimbursed: data.reimbursement.claims_reimbursed,
            lab_tat_hours: data.lab_metrics.average_turnaround_hours,
            lab_target_hours: data.lab_metrics.target_turnaround_hours,
            operating_costs_millions: data.operating_costs.total_operating_costs / 1_000_000.0,
            forecast_thousands: data.forecasting.next_quarter_orders / 1_000.0,
            alerts,
        }
    }
}
