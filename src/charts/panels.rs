//! Which charts each tab panel draws, and from which fields.

use super::progress_ring::{headroom_rings, metric_rings};
use super::{Series, SeriesSpec};
use crate::config::schema::{DashboardConfig, DisplayLimits};
use crate::normalize::TabPayload;
use crate::normalize::model::{
    Compliance, Forecasting, LabMetrics, Milestones, OperatingCosts, OrderVolume, Overview,
    Reimbursement, Regional,
};

/// A chart to draw on one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelChart {
    pub canvas: String,
    pub spec: SeriesSpec,
}

impl PanelChart {
    fn new(canvas: impl Into<String>, spec: SeriesSpec) -> Self {
        Self {
            canvas: canvas.into(),
            spec,
        }
    }
}

/// Charts for a normalized payload. Payloads without charts give none.
pub fn specs_for(payload: &TabPayload, config: &DashboardConfig) -> Vec<PanelChart> {
    match payload {
        TabPayload::Overview(data) => overview(data, config),
        TabPayload::Orders(data) => orders(data),
        TabPayload::Compliance(data) => compliance(data),
        TabPayload::Reimbursement(data) => reimbursement(data),
        TabPayload::Costs(data) => costs(data),
        TabPayload::Lab(data) => lab(data),
        TabPayload::Regional(data) => regional(data, &config.limits),
        TabPayload::Forecasting(data) => forecasting(data),
        TabPayload::Milestones(data) => milestones(data),
        TabPayload::Market(_) | TabPayload::Stock(_) | TabPayload::Email(_) => Vec::new(),
    }
}

/// Canvas id of a metric card: `chartOrders` for `orders`.
pub fn metric_canvas(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => format!("chart{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "chart".to_string(),
    }
}

fn last_n<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn overview(data: &Overview, config: &DashboardConfig) -> Vec<PanelChart> {
    let trend = data.order_volume.trend_data.iter().take(3);
    let orders = headroom_rings(
        trend.map(|p| (p.period.clone(), p.count)),
        "Order Volume",
        data.order_volume
            .trend_data
            .first()
            .map(|p| p.period.as_str())
            .unwrap_or("Orders"),
    );

    let costs = headroom_rings(
        last_n(&data.operating_costs.monthly_trend, 3)
            .iter()
            .map(|p| (p.month.clone(), p.total_cost / 1_000_000.0)),
        "Operating Costs ($M)",
        "Costs",
    );

    let mut charts = vec![
        PanelChart::new("overviewOrdersChart", SeriesSpec::ProgressRing(orders)),
        PanelChart::new("overviewFinancialsChart", SeriesSpec::ProgressRing(costs)),
    ];
    charts.extend(config.metrics.iter().map(|(id, metric)| {
        PanelChart::new(metric_canvas(id), SeriesSpec::ProgressRing(metric_rings(metric)))
    }));
    charts
}

fn orders(data: &OrderVolume) -> Vec<PanelChart> {
    let trend = last_n(&data.trend_data, 3);
    let detail = headroom_rings(
        trend.iter().map(|p| (p.period.clone(), p.count)),
        "Order Volume Trend",
        trend.first().map(|p| p.period.as_str()).unwrap_or("Orders"),
    );

    let mut categories = data.by_category.clone();
    categories.sort_by(|a, b| b.count.total_cmp(&a.count));
    let category = headroom_rings(
        categories.iter().take(3).map(|c| (c.category.clone(), c.count)),
        "Orders by Category",
        categories.first().map(|c| c.category.as_str()).unwrap_or("Category"),
    );

    vec![
        PanelChart::new("ordersDetailChart", SeriesSpec::ProgressRing(detail)),
        PanelChart::new("ordersCategoryChart", SeriesSpec::ProgressRing(category)),
    ]
}

fn compliance(data: &Compliance) -> Vec<PanelChart> {
    let months = last_n(&data.monthly_trend, 3);
    let (labels, values): (Vec<String>, Vec<f64>) = months
        .iter()
        .map(|p| (p.month.clone(), 100.0 - p.return_rate))
        .unzip();
    let count = values.len();
    let trend = Series::new(labels, values)
        .with_max(vec![100.0; count])
        .with_title("Compliance Trend")
        .with_center_label(months.first().map(|p| p.month.as_str()).unwrap_or("Compliance"));

    let reasons = headroom_rings(
        data.top_return_reasons
            .iter()
            .take(3)
            .map(|r| (r.reason.clone(), r.count)),
        "Return Reasons",
        data.top_return_reasons
            .first()
            .map(|r| r.reason.as_str())
            .unwrap_or("Returns"),
    );

    vec![
        PanelChart::new("complianceTrendChart", SeriesSpec::ProgressRing(trend)),
        PanelChart::new("complianceReasonsChart", SeriesSpec::ProgressRing(reasons)),
    ]
}

fn reimbursement(data: &Reimbursement) -> Vec<PanelChart> {
    let trend = Series::new(
        data.monthly_trend.iter().map(|p| p.month.clone()),
        data.monthly_trend
            .iter()
            .map(|p| p.amount / 1_000_000.0)
            .collect(),
    )
    .with_title("Reimbursed ($M)");

    // Pie of payer amounts; the largest payer's claims are broken out.
    let pie = Series::new(
        data.by_payer.iter().map(|p| p.payer_name.clone()),
        data.by_payer.iter().map(|p| p.amount).collect(),
    )
    .with_title("Reimbursement by Payer");
    let largest = data
        .by_payer
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.amount.total_cmp(&b.amount));
    let (breakdown_index, breakdown) = match largest {
        Some((index, payer)) => (
            index,
            Series::new(
                ["Reimbursed", "Outstanding"],
                vec![
                    payer.reimbursed_claims,
                    (payer.claims - payer.reimbursed_claims).max(0.0),
                ],
            )
            .with_title(format!("{} Claims", payer.payer_name)),
        ),
        None => (0, Series::default()),
    };

    vec![
        PanelChart::new("reimbursementTrendChart", SeriesSpec::Bar(trend)),
        PanelChart::new(
            "reimbursementPayerChart",
            SeriesSpec::BarOfPie {
                pie,
                breakdown_index,
                breakdown,
            },
        ),
    ]
}

fn costs(data: &OperatingCosts) -> Vec<PanelChart> {
    let trend = Series::new(
        data.monthly_trend.iter().map(|p| p.month.clone()),
        data.monthly_trend
            .iter()
            .map(|p| p.total_cost / 1_000_000.0)
            .collect(),
    )
    .with_title("Operating Costs ($M)");

    let b = &data.breakdown;
    let breakdown = Series::new(
        ["Labor", "Equipment", "Supplies", "Overhead"],
        vec![b.labor, b.equipment, b.supplies, b.overhead],
    )
    .with_title("Cost Breakdown");

    vec![
        PanelChart::new("costsTrendChart", SeriesSpec::Bar(trend)),
        PanelChart::new("costsBreakdownChart", SeriesSpec::Doughnut(breakdown)),
    ]
}

fn lab(data: &LabMetrics) -> Vec<PanelChart> {
    let points = last_n(&data.turnaround_trend, 3);
    let (labels, values): (Vec<String>, Vec<f64>) =
        points.iter().map(|p| (p.period.clone(), p.hours)).unzip();
    let count = values.len();
    let tat = Series::new(labels, values)
        .with_max(vec![data.target_turnaround_hours * 1.5; count])
        .with_title("TAT Trend")
        .with_center_label(points.first().map(|p| p.period.as_str()).unwrap_or("TAT"));

    let mut types = data.tests_by_type.clone();
    types.sort_by(|a, b| b.count.total_cmp(&a.count));
    let tests = headroom_rings(
        types.iter().take(3).map(|t| (t.test_type.clone(), t.count)),
        "Tests by Type",
        types.first().map(|t| t.test_type.as_str()).unwrap_or("Tests"),
    );

    vec![
        PanelChart::new("labTatChart", SeriesSpec::ProgressRing(tat)),
        PanelChart::new("labTestsChart", SeriesSpec::ProgressRing(tests)),
    ]
}

fn regional(data: &Regional, limits: &DisplayLimits) -> Vec<PanelChart> {
    let mut territories = data.territories.clone();
    territories.sort_by(|a, b| b.orders.total_cmp(&a.orders));
    territories.truncate(limits.top_territories);

    let names = || territories.iter().map(|t| t.territory_name.clone());
    let orders = Series::new(names(), territories.iter().map(|t| t.orders).collect())
        .with_title("Orders by Territory");
    let growth = Series::new(names(), territories.iter().map(|t| t.growth).collect())
        .with_title("Growth by Territory (%)");

    vec![
        PanelChart::new("regionalOrdersChart", SeriesSpec::Bar(orders)),
        PanelChart::new("regionalGrowthChart", SeriesSpec::Bar(growth)),
    ]
}

fn forecasting(data: &Forecasting) -> Vec<PanelChart> {
    let quarters = || data.quarterly_forecast.iter().map(|q| q.quarter.clone());
    let orders = Series::new(
        quarters(),
        data.quarterly_forecast
            .iter()
            .map(|q| q.predicted_orders)
            .collect(),
    )
    .with_title("Predicted Orders");
    let revenue = Series::new(
        quarters(),
        data.quarterly_forecast
            .iter()
            .map(|q| q.revenue / 1_000_000.0)
            .collect(),
    )
    .with_title("Revenue Forecast ($M)");

    vec![
        PanelChart::new("forecastOrdersChart", SeriesSpec::Line(orders)),
        PanelChart::new("forecastRevenueChart", SeriesSpec::Bar(revenue)),
    ]
}

fn milestones(data: &Milestones) -> Vec<PanelChart> {
    let inner = Series::new(
        ["On Track", "At Risk", "Delayed"],
        vec![
            f64::from(data.projects_on_track),
            f64::from(data.projects_at_risk),
            f64::from(data.projects_delayed),
        ],
    )
    .with_title("Project Status");
    let outer = Series::new(
        data.active_projects.iter().map(|p| p.project_name.clone()),
        data.active_projects
            .iter()
            .map(|p| p.completion_percentage)
            .collect(),
    )
    .with_title("Project Status");

    vec![PanelChart::new(
        "milestonesStatusChart",
        SeriesSpec::MultilevelDonut { inner, outer },
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Section, fallback, fallback_payload};

    fn canvases(charts: &[PanelChart]) -> Vec<&str> {
        charts.iter().map(|c| c.canvas.as_str()).collect()
    }

    #[test]
    fn metric_canvas_capitalizes() {
        assert_eq!(metric_canvas("orders"), "chartOrders");
        assert_eq!(metric_canvas(""), "chart");
    }

    #[test]
    fn overview_has_panel_and_metric_charts() {
        let config = DashboardConfig::default();
        let charts = specs_for(&fallback_payload(Section::Overview), &config);
        let ids = canvases(&charts);
        assert!(ids.contains(&"overviewOrdersChart"));
        assert!(ids.contains(&"overviewFinancialsChart"));
        assert!(ids.contains(&"chartOrders"));
        assert_eq!(charts.len(), 2 + config.metrics.len());
    }

    #[test]
    fn orders_trend_uses_last_three_periods_with_headroom() {
        let data = &fallback::overview().order_volume;
        let charts = orders(data);
        let SeriesSpec::ProgressRing(series) = &charts[0].spec else {
            panic!("expected a progress ring");
        };
        let expected: Vec<String> = last_n(&data.trend_data, 3)
            .iter()
            .map(|p| p.period.clone())
            .collect();
        assert_eq!(series.labels, expected);
        let largest = series.values.iter().copied().fold(0.0, f64::max);
        assert_eq!(series.max_values, Some(vec![largest * 1.2; series.values.len()]));
    }

    #[test]
    fn compliance_trend_is_inverse_of_return_rate() {
        let charts = compliance(&fallback::overview().compliance);
        let SeriesSpec::ProgressRing(series) = &charts[0].spec else {
            panic!("expected a progress ring");
        };
        assert!(series.values.iter().all(|v| *v > 90.0 && *v <= 100.0));
        assert!(series.max_values.iter().flatten().all(|m| *m == 100.0));
    }

    #[test]
    fn regional_respects_top_territories_limit() {
        let limits = DisplayLimits {
            top_territories: 2,
            ..DisplayLimits::default()
        };
        let charts = regional(&fallback::overview().regional, &limits);
        let SeriesSpec::Bar(series) = &charts[0].spec else {
            panic!("expected a bar chart");
        };
        assert!(series.labels.len() <= 2);
    }

    #[test]
    fn empty_payloads_still_produce_drawable_specs() {
        let config = DashboardConfig::default();
        for section in [Section::Orders, Section::Lab, Section::Reimbursement] {
            let payload = match section {
                Section::Orders => TabPayload::Orders(OrderVolume::default()),
                Section::Lab => TabPayload::Lab(LabMetrics::default()),
                _ => TabPayload::Reimbursement(Reimbursement::default()),
            };
            for chart in specs_for(&payload, &config) {
                let _ = chart.spec.figure();
            }
        }
    }

    #[test]
    fn market_has_no_charts() {
        let config = DashboardConfig::default();
        assert!(specs_for(&fallback_payload(Section::Market), &config).is_empty());
    }
}
