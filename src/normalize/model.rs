//! Canonical per-tab data shapes.
//!
//! Every renderer reads these structs and nothing else. All scalar fields are
//! concrete, and lists are empty rather than absent, so a consumer only ever
//! checks for emptiness.

use serde::{Deserialize, Serialize};

/// Full overview payload: one canonical section per data tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub order_volume: OrderVolume,
    pub compliance: Compliance,
    pub reimbursement: Reimbursement,
    pub operating_costs: OperatingCosts,
    pub lab_metrics: LabMetrics,
    pub regional: Regional,
    pub forecasting: Forecasting,
    pub market_intelligence: MarketIntelligence,
    pub milestones: Milestones,
    pub stock: StockQuote,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderVolume {
    pub monthly_orders: f64,
    pub average_daily_orders: f64,
    pub peak_day_orders: f64,
    pub growth_metrics: GrowthMetrics,
    pub trend_data: Vec<TrendPoint>,
    pub by_category: Vec<CategoryShare>,
}

/// Growth in percent over the previous month, year and quarter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub mom: f64,
    pub yoy: f64,
    pub qoq: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub count: f64,
    /// Percent change from the previous point. Always 0 for the first.
    pub growth: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: f64,
    pub percentage: f64,
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compliance {
    pub overall_return_rate: f64,
    pub rejection_rate: f64,
    pub compliance_rate: f64,
    pub total_returns: f64,
    pub total_claims: f64,
    pub monthly_trend: Vec<ReturnPoint>,
    pub top_return_reasons: Vec<ReturnReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub month: String,
    pub return_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnReason {
    pub reason: String,
    pub count: f64,
    pub percentage: f64,
}

// ---------------------------------------------------------------------------
// Reimbursement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reimbursement {
    pub total_reimbursed: f64,
    pub pending_amount: f64,
    pub average_processing_days: f64,
    pub total_claims: f64,
    pub claims_reimbursed: f64,
    pub reimbursement_percentage: f64,
    pub growth_rate: f64,
    pub monthly_trend: Vec<AmountPoint>,
    pub by_payer: Vec<Payer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountPoint {
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub payer_name: String,
    pub amount: f64,
    pub percentage: f64,
    pub claims: f64,
    pub reimbursed_claims: f64,
    pub reimbursement_rate: f64,
    pub avg_turnaround_days: f64,
}

// ---------------------------------------------------------------------------
// Operating costs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingCosts {
    pub total_operating_costs: f64,
    pub cost_per_test: f64,
    pub breakdown: CostBreakdown,
    pub monthly_trend: Vec<CostPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub labor: f64,
    pub equipment: f64,
    pub supplies: f64,
    pub overhead: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub month: String,
    pub total_cost: f64,
}

// ---------------------------------------------------------------------------
// Lab
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabMetrics {
    pub average_turnaround_hours: f64,
    pub target_turnaround_hours: f64,
    pub tests_processed: f64,
    pub lab_capacity: LabCapacity,
    pub efficiency_score: f64,
    pub error_rate: f64,
    pub turnaround_trend: Vec<HoursPoint>,
    pub tests_by_type: Vec<TestTypeCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabCapacity {
    pub utilization_percentage: f64,
    pub current_load: f64,
    pub max_capacity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursPoint {
    pub period: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestTypeCount {
    pub test_type: String,
    pub count: f64,
}

// ---------------------------------------------------------------------------
// Regional
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Regional {
    pub territories: Vec<Territory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub territory_name: String,
    pub orders: f64,
    pub revenue: f64,
    pub growth: f64,
}

// ---------------------------------------------------------------------------
// Forecasting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecasting {
    pub next_quarter_orders: f64,
    pub forecast_growth: f64,
    pub revenue_forecast: f64,
    pub confidence_level: f64,
    pub year_end_projection: f64,
    pub assumptions: Assumptions,
    pub quarterly_forecast: Vec<QuarterForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub market_growth_rate: f64,
    pub seasonality_factor: String,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            market_growth_rate: 0.0,
            seasonality_factor: "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarterForecast {
    pub quarter: String,
    pub predicted_orders: f64,
    pub confidence: f64,
    pub revenue: f64,
    pub growth: f64,
}

// ---------------------------------------------------------------------------
// Market intelligence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketIntelligence {
    pub latest_news: Vec<NewsItem>,
    pub competitor_updates: Vec<CompetitorUpdate>,
    pub critical_alerts: Vec<String>,
    pub market_trends: MarketTrends,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub date: String,
    pub importance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorUpdate {
    pub competitor_name: String,
    pub description: String,
    pub impact_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTrends {
    pub market_share: Vec<MarketShare>,
    pub market_size_billions: f64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketShare {
    pub company: String,
    pub share: f64,
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Milestones {
    pub total_projects: u32,
    pub projects_on_track: u32,
    pub projects_at_risk: u32,
    pub projects_delayed: u32,
    pub active_projects: Vec<Project>,
    pub critical_items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_name: String,
    pub overall_status: ProjectStatus,
    pub completion_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    OnTrack,
    AtRisk,
    Delayed,
    Completed,
}

impl ProjectStatus {
    /// Parse a backend status string. Unknown values read as on track.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "at_risk" => Self::AtRisk,
            "delayed" => Self::Delayed,
            "completed" | "complete" | "done" => Self::Completed,
            _ => Self::OnTrack,
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnTrack => write!(f, "on_track"),
            Self::AtRisk => write!(f, "at_risk"),
            Self::Delayed => write!(f, "delayed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub current_price: Price,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: f64,
    pub pe_ratio: f64,
    pub market_cap: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub price: f64,
    pub change: f64,
    /// Signed percent text as displayed, e.g. `+1.88`.
    pub change_percentage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_status_parse() {
        assert_eq!(ProjectStatus::parse("at_risk"), ProjectStatus::AtRisk);
        assert_eq!(ProjectStatus::parse("At Risk"), ProjectStatus::AtRisk);
        assert_eq!(ProjectStatus::parse("delayed"), ProjectStatus::Delayed);
        assert_eq!(ProjectStatus::parse("something"), ProjectStatus::OnTrack);
    }

    #[test]
    fn assumptions_default_reads_not_available() {
        assert_eq!(Assumptions::default().seasonality_factor, "N/A");
    }
}
