//! Backend section shapes as they arrive on the wire.
//!
//! Every field is optional and every known legacy spelling has its own slot,
//! so deserialization only fails on a type clash (a string where a list
//! belongs). The rules in [`super::rules`] turn these into canonical structs.

use serde::{Deserialize, Deserializer};

/// A number the backend may send as a JSON number or a numeric string
/// (`"12.3"`, produced by fixed-point formatting upstream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Num(pub f64);

impl<'de> Deserialize<'de> for Num {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Num(n)),
            Repr::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .parse::<f64>()
                .map(Num)
                .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{s}'"))),
        }
    }
}

/// Read an optional lenient number as `Option<f64>`.
pub fn num(value: Option<Num>) -> Option<f64> {
    value.map(|n| n.0).filter(|n| n.is_finite())
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// `data` of the overview endpoint: one optional object per section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOverview {
    pub order_volume: Option<RawOrders>,
    pub compliance: Option<RawCompliance>,
    pub reimbursement: Option<RawReimbursement>,
    pub operating_costs: Option<RawCosts>,
    pub lab_metrics: Option<RawLab>,
    pub regional: Option<RawRegional>,
    pub forecasting: Option<RawForecasting>,
    pub market_intelligence: Option<RawMarket>,
    pub milestones: Option<RawMilestones>,
    pub stock: Option<RawStock>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOrders {
    pub monthly_orders: Option<Num>,
    pub average_daily_orders: Option<Num>,
    pub peak_day_orders: Option<Num>,
    pub growth_metrics: Option<RawGrowth>,
    pub trend_data: Option<Vec<RawTrendPoint>>,
    pub by_category: Option<Vec<RawCategory>>,
    pub product_lines: Option<Vec<RawProductLine>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGrowth {
    pub mom: Option<Num>,
    pub yoy: Option<Num>,
    pub qoq: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTrendPoint {
    pub period: Option<String>,
    pub count: Option<Num>,
    pub growth: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCategory {
    pub category: Option<String>,
    pub count: Option<Num>,
    pub orders: Option<Num>,
    pub percentage: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProductLine {
    pub product_line: Option<String>,
    pub orders: Option<Num>,
    pub percentage: Option<Num>,
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCompliance {
    pub overall_return_rate: Option<Num>,
    pub rejection_rate: Option<Num>,
    pub compliance_rate: Option<Num>,
    pub total_returns: Option<Num>,
    pub total_claims: Option<Num>,
    pub monthly_trend: Option<Vec<RawReturnPoint>>,
    pub top_return_reasons: Option<Vec<RawReturnReason>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReturnPoint {
    pub month: Option<String>,
    pub return_rate: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReturnReason {
    pub reason: Option<String>,
    pub count: Option<Num>,
    pub percentage: Option<Num>,
}

// ---------------------------------------------------------------------------
// Reimbursement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReimbursement {
    pub total_reimbursed: Option<Num>,
    pub total_reimbursed_amount: Option<Num>,
    pub pending_amount: Option<Num>,
    pub average_processing_days: Option<Num>,
    pub average_turnaround_days: Option<Num>,
    pub total_claims: Option<Num>,
    pub claims_reimbursed: Option<Num>,
    pub reimbursement_percentage: Option<Num>,
    pub growth_rate: Option<Num>,
    pub monthly_trend: Option<Vec<RawAmountPoint>>,
    pub by_payer: Option<Vec<RawPayer>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAmountPoint {
    pub month: Option<String>,
    pub amount: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPayer {
    pub payer_name: Option<String>,
    pub amount: Option<Num>,
    pub percentage: Option<Num>,
    pub claims: Option<Num>,
    pub reimbursed_claims: Option<Num>,
    pub reimbursement_rate: Option<Num>,
    pub avg_turnaround_days: Option<Num>,
}

// ---------------------------------------------------------------------------
// Operating costs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCosts {
    pub total_operating_costs: Option<Num>,
    pub total_monthly_costs: Option<Num>,
    pub cost_per_test: Option<Num>,
    pub breakdown: Option<RawCostBreakdown>,
    pub monthly_trend: Option<Vec<RawCostPoint>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCostBreakdown {
    pub labor: Option<Num>,
    pub equipment: Option<Num>,
    pub supplies: Option<Num>,
    pub overhead: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCostPoint {
    pub month: Option<String>,
    pub total_cost: Option<Num>,
    pub cost: Option<Num>,
}

// ---------------------------------------------------------------------------
// Lab
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLab {
    pub average_turnaround_hours: Option<Num>,
    pub average_tat_hours: Option<Num>,
    pub target_turnaround_hours: Option<Num>,
    pub tests_processed: Option<Num>,
    pub capacity_utilization: Option<Num>,
    pub lab_capacity: Option<RawLabCapacity>,
    pub efficiency_score: Option<Num>,
    pub error_rate: Option<Num>,
    pub turnaround_trend: Option<Vec<RawHoursPoint>>,
    pub tests_by_type: Option<Vec<RawTestType>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLabCapacity {
    pub utilization_percentage: Option<Num>,
    pub current_load: Option<Num>,
    pub max_capacity: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawHoursPoint {
    pub period: Option<String>,
    pub hours: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTestType {
    pub test_type: Option<String>,
    pub count: Option<Num>,
}

// ---------------------------------------------------------------------------
// Regional
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRegional {
    pub territories: Option<Vec<RawTerritory>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTerritory {
    pub territory_name: Option<String>,
    pub orders: Option<Num>,
    pub total_orders: Option<Num>,
    pub revenue: Option<Num>,
    pub growth: Option<Num>,
}

// ---------------------------------------------------------------------------
// Forecasting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawForecasting {
    pub next_quarter_orders: Option<Num>,
    pub forecast_growth: Option<Num>,
    pub revenue_forecast: Option<Num>,
    pub confidence_level: Option<Num>,
    pub year_end_projection: Option<Num>,
    pub assumptions: Option<RawAssumptions>,
    pub quarterly_forecast: Option<Vec<RawQuarter>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAssumptions {
    pub market_growth_rate: Option<Num>,
    pub seasonality_factor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuarter {
    pub quarter: Option<String>,
    pub predicted_orders: Option<Num>,
    pub orders: Option<Num>,
    pub confidence: Option<Num>,
    pub revenue: Option<Num>,
    pub growth: Option<Num>,
}

// ---------------------------------------------------------------------------
// Market intelligence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMarket {
    pub latest_news: Option<Vec<RawNewsItem>>,
    pub news: Option<Vec<RawLegacyNews>>,
    pub competitor_updates: Option<Vec<RawCompetitorUpdate>>,
    pub competitors: Option<Vec<RawLegacyCompetitor>>,
    pub critical_alerts: Option<Vec<String>>,
    pub market_trends: Option<RawMarketTrends>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawNewsItem {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub importance: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLegacyNews {
    pub title: Option<String>,
    pub source: Option<String>,
    pub timestamp: Option<String>,
    pub relevance: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCompetitorUpdate {
    pub competitor_name: Option<String>,
    pub description: Option<String>,
    pub impact_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLegacyCompetitor {
    pub name: Option<String>,
    pub activity: Option<String>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMarketTrends {
    pub market_share: Option<Vec<RawMarketShare>>,
    pub market_size_billions: Option<Num>,
    pub growth_rate: Option<Num>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMarketShare {
    pub company: Option<String>,
    pub share: Option<Num>,
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMilestones {
    pub total_projects: Option<Num>,
    pub projects_on_track: Option<Num>,
    pub projects_at_risk: Option<Num>,
    pub projects_delayed: Option<Num>,
    pub active_projects: Option<Vec<RawActiveProject>>,
    pub projects: Option<Vec<RawLegacyProject>>,
    pub critical_items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawActiveProject {
    pub project_name: Option<String>,
    pub overall_status: Option<String>,
    pub completion_percentage: Option<Num>,
    pub due_date: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLegacyProject {
    pub name: Option<String>,
    pub status: Option<String>,
    pub completion: Option<Num>,
    pub due_date: Option<String>,
    pub owner: Option<String>,
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStock {
    pub current_price: Option<RawPrice>,
    pub day_high: Option<Num>,
    pub day_low: Option<Num>,
    pub volume: Option<Num>,
    pub pe_ratio: Option<Num>,
    pub market_cap: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPrice {
    pub price: Option<Num>,
    pub change: Option<Num>,
    pub change_percentage: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn num_accepts_numbers_and_numeric_strings() {
        let point: RawTrendPoint =
            serde_json::from_value(json!({"period": "Feb", "count": 10, "growth": "3.5"})).unwrap();
        assert_eq!(num(point.count), Some(10.0));
        assert_eq!(num(point.growth), Some(3.5));
    }

    #[test]
    fn num_rejects_words() {
        let result: Result<RawTrendPoint, _> =
            serde_json::from_value(json!({"count": "lots"}));
        assert!(result.is_err());
    }

    #[test]
    fn null_fields_read_as_absent() {
        let orders: RawOrders =
            serde_json::from_value(json!({"monthly_orders": null, "trend_data": null})).unwrap();
        assert!(orders.monthly_orders.is_none());
        assert!(orders.trend_data.is_none());
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let overview: RawOverview =
            serde_json::from_value(json!({"workforce": {"headcount": 12}})).unwrap();
        assert!(overview.order_volume.is_none());
    }
}
