//! Shape-reconciliation rules, one function per backend section.
//!
//! Each rule fills a canonical field from the first source that has it: the
//! canonical name, then any legacy name, then a derivation, then a default.
//! A present value is never recomputed, which is what makes normalizing an
//! already-normalized payload a no-op.

use super::model::*;
use super::raw::*;

/// Daily orders derived from a monthly figure.
const DAYS_PER_MONTH: f64 = 30.0;
/// Share of returns estimated to be outright rejections.
const REJECTION_SHARE_OF_RETURNS: f64 = 0.6;
/// Share of monthly orders assumed unreimbursed when the count is missing.
const UNREIMBURSED_SHARE: f64 = 0.02;
const DEFAULT_TARGET_TAT_HOURS: f64 = 42.0;
const DEFAULT_EFFICIENCY_SCORE: f64 = 94.5;
const DEFAULT_ERROR_RATE: f64 = 0.8;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn text(value: Option<String>) -> String {
    value.unwrap_or_default()
}

/// `part / whole * 100`, or `None` when the ratio is undefined.
fn percent_of(part: Option<f64>, whole: Option<f64>) -> Option<f64> {
    match (part, whole) {
        (Some(p), Some(w)) if w > 0.0 => Some(p / w * 100.0),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Normalize every section of the overview payload.
///
/// Missing sections normalize from an empty object, except `stock`, which
/// gets the placeholder quote.
pub fn overview(raw: RawOverview) -> Overview {
    let order_volume = orders(raw.order_volume.unwrap_or_default());
    let reimbursement = reimbursement(
        raw.reimbursement.unwrap_or_default(),
        Some(order_volume.monthly_orders),
    );

    Overview {
        compliance: compliance(raw.compliance.unwrap_or_default()),
        reimbursement,
        operating_costs: costs(raw.operating_costs.unwrap_or_default()),
        lab_metrics: lab(raw.lab_metrics.unwrap_or_default()),
        regional: regional(raw.regional.unwrap_or_default()),
        forecasting: forecasting(raw.forecasting.unwrap_or_default()),
        market_intelligence: market(raw.market_intelligence.unwrap_or_default()),
        milestones: milestones(raw.milestones.unwrap_or_default()),
        stock: stock(raw.stock),
        order_volume,
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub fn orders(raw: RawOrders) -> OrderVolume {
    let trend_data = trend_with_growth(raw.trend_data.unwrap_or_default());

    let monthly_orders = num(raw.monthly_orders).unwrap_or(0.0);
    let average_daily_orders = num(raw.average_daily_orders)
        .unwrap_or_else(|| (monthly_orders / DAYS_PER_MONTH).round());
    let peak_day_orders = num(raw.peak_day_orders).unwrap_or_else(|| {
        trend_data
            .iter()
            .map(|p| p.count)
            .fold(None, |max: Option<f64>, c| Some(max.map_or(c, |m| m.max(c))))
            .unwrap_or(0.0)
    });

    let growth = raw.growth_metrics.unwrap_or_default();
    let growth_metrics = GrowthMetrics {
        mom: num(growth.mom).unwrap_or(0.0),
        yoy: num(growth.yoy).unwrap_or(0.0),
        qoq: num(growth.qoq).unwrap_or(0.0),
    };

    let by_category = match (raw.by_category, raw.product_lines) {
        (Some(categories), _) => categories
            .into_iter()
            .map(|c| CategoryShare {
                category: text(c.category),
                count: num(c.count).or(num(c.orders)).unwrap_or(0.0),
                percentage: num(c.percentage).unwrap_or(0.0),
            })
            .collect(),
        (None, Some(lines)) => lines
            .into_iter()
            .map(|p| CategoryShare {
                category: text(p.product_line),
                count: num(p.orders).unwrap_or(0.0),
                percentage: num(p.percentage).unwrap_or(0.0),
            })
            .collect(),
        (None, None) => Vec::new(),
    };

    OrderVolume {
        monthly_orders,
        average_daily_orders,
        peak_day_orders,
        growth_metrics,
        trend_data,
        by_category,
    }
}

/// Fill each point's growth as the percent change from its predecessor.
///
/// The first point is always 0. A zero predecessor yields 0 rather than
/// an infinite growth figure.
fn trend_with_growth(points: Vec<RawTrendPoint>) -> Vec<TrendPoint> {
    let mut previous: Option<f64> = None;
    let mut out = Vec::with_capacity(points.len());

    for (i, point) in points.into_iter().enumerate() {
        let count = num(point.count).unwrap_or(0.0);
        let growth = if i == 0 {
            0.0
        } else {
            num(point.growth).unwrap_or_else(|| match previous {
                Some(prev) if prev != 0.0 => round1((count - prev) / prev * 100.0),
                _ => 0.0,
            })
        };
        previous = Some(count);
        out.push(TrendPoint {
            period: text(point.period),
            count,
            growth,
        });
    }

    out
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

pub fn compliance(raw: RawCompliance) -> Compliance {
    let overall_return_rate = num(raw.overall_return_rate).unwrap_or(0.0);

    Compliance {
        overall_return_rate,
        rejection_rate: num(raw.rejection_rate)
            .unwrap_or(overall_return_rate * REJECTION_SHARE_OF_RETURNS),
        compliance_rate: num(raw.compliance_rate).unwrap_or(100.0 - overall_return_rate),
        total_returns: num(raw.total_returns).unwrap_or(0.0),
        total_claims: num(raw.total_claims).unwrap_or(0.0),
        monthly_trend: raw
            .monthly_trend
            .unwrap_or_default()
            .into_iter()
            .map(|p| ReturnPoint {
                month: text(p.month),
                return_rate: num(p.return_rate).unwrap_or(0.0),
            })
            .collect(),
        top_return_reasons: raw
            .top_return_reasons
            .unwrap_or_default()
            .into_iter()
            .map(|r| ReturnReason {
                reason: text(r.reason),
                count: num(r.count).unwrap_or(0.0),
                percentage: num(r.percentage).unwrap_or(0.0),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Reimbursement
// ---------------------------------------------------------------------------

/// `monthly_orders` is only known when the whole overview is normalized; it
/// backs the claims-reimbursed estimate.
pub fn reimbursement(raw: RawReimbursement, monthly_orders: Option<f64>) -> Reimbursement {
    let total_reimbursed = num(raw.total_reimbursed).or(num(raw.total_reimbursed_amount));
    let pending_amount = num(raw.pending_amount);
    let total_claims = num(raw.total_claims);

    let claims_reimbursed = num(raw.claims_reimbursed).or_else(|| {
        monthly_orders
            .filter(|m| *m > 0.0)
            .map(|m| m - (m * UNREIMBURSED_SHARE).floor())
    });

    let reimbursement_percentage = num(raw.reimbursement_percentage)
        .or_else(|| match (total_reimbursed, pending_amount) {
            (Some(t), Some(p)) => percent_of(Some(t), Some(t + p)),
            _ => None,
        })
        .or_else(|| percent_of(num(raw.claims_reimbursed), total_claims))
        .unwrap_or(0.0);

    Reimbursement {
        total_reimbursed: total_reimbursed.unwrap_or(0.0),
        pending_amount: pending_amount.unwrap_or(0.0),
        average_processing_days: num(raw.average_processing_days)
            .or(num(raw.average_turnaround_days))
            .unwrap_or(0.0),
        total_claims: total_claims.unwrap_or(0.0),
        claims_reimbursed: claims_reimbursed.unwrap_or(0.0),
        reimbursement_percentage,
        growth_rate: num(raw.growth_rate).unwrap_or(0.0),
        monthly_trend: raw
            .monthly_trend
            .unwrap_or_default()
            .into_iter()
            .map(|p| AmountPoint {
                month: text(p.month),
                amount: num(p.amount).unwrap_or(0.0),
            })
            .collect(),
        by_payer: raw
            .by_payer
            .unwrap_or_default()
            .into_iter()
            .map(payer)
            .collect(),
    }
}

fn payer(raw: RawPayer) -> Payer {
    let claims = num(raw.claims);
    let reimbursed_claims = num(raw.reimbursed_claims);
    Payer {
        payer_name: text(raw.payer_name),
        amount: num(raw.amount).unwrap_or(0.0),
        percentage: num(raw.percentage).unwrap_or(0.0),
        claims: claims.unwrap_or(0.0),
        reimbursed_claims: reimbursed_claims.unwrap_or(0.0),
        reimbursement_rate: num(raw.reimbursement_rate)
            .or_else(|| percent_of(reimbursed_claims, claims))
            .unwrap_or(0.0),
        avg_turnaround_days: num(raw.avg_turnaround_days).unwrap_or(0.0),
    }
}

// ---------------------------------------------------------------------------
// Operating costs
// ---------------------------------------------------------------------------

pub fn costs(raw: RawCosts) -> OperatingCosts {
    let breakdown = raw.breakdown.unwrap_or_default();
    OperatingCosts {
        total_operating_costs: num(raw.total_operating_costs)
            .or(num(raw.total_monthly_costs))
            .unwrap_or(0.0),
        cost_per_test: num(raw.cost_per_test).unwrap_or(0.0),
        breakdown: CostBreakdown {
            labor: num(breakdown.labor).unwrap_or(0.0),
            equipment: num(breakdown.equipment).unwrap_or(0.0),
            supplies: num(breakdown.supplies).unwrap_or(0.0),
            overhead: num(breakdown.overhead).unwrap_or(0.0),
        },
        monthly_trend: raw
            .monthly_trend
            .unwrap_or_default()
            .into_iter()
            .map(|p| CostPoint {
                month: text(p.month),
                total_cost: num(p.total_cost).or(num(p.cost)).unwrap_or(0.0),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Lab
// ---------------------------------------------------------------------------

pub fn lab(raw: RawLab) -> LabMetrics {
    let capacity = match raw.lab_capacity {
        Some(c) => LabCapacity {
            utilization_percentage: num(c.utilization_percentage)
                .or(num(raw.capacity_utilization))
                .unwrap_or(0.0),
            current_load: num(c.current_load).unwrap_or(0.0),
            max_capacity: num(c.max_capacity).unwrap_or(0.0),
        },
        None => LabCapacity {
            utilization_percentage: num(raw.capacity_utilization).unwrap_or(0.0),
            ..LabCapacity::default()
        },
    };

    LabMetrics {
        average_turnaround_hours: num(raw.average_turnaround_hours)
            .or(num(raw.average_tat_hours))
            .unwrap_or(0.0),
        target_turnaround_hours: num(raw.target_turnaround_hours)
            .unwrap_or(DEFAULT_TARGET_TAT_HOURS),
        tests_processed: num(raw.tests_processed).unwrap_or(0.0),
        lab_capacity: capacity,
        efficiency_score: num(raw.efficiency_score).unwrap_or(DEFAULT_EFFICIENCY_SCORE),
        error_rate: num(raw.error_rate).unwrap_or(DEFAULT_ERROR_RATE),
        turnaround_trend: raw
            .turnaround_trend
            .unwrap_or_default()
            .into_iter()
            .map(|p| HoursPoint {
                period: text(p.period),
                hours: num(p.hours).unwrap_or(0.0),
            })
            .collect(),
        tests_by_type: raw
            .tests_by_type
            .unwrap_or_default()
            .into_iter()
            .map(|t| TestTypeCount {
                test_type: text(t.test_type),
                count: num(t.count).unwrap_or(0.0),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Regional
// ---------------------------------------------------------------------------

pub fn regional(raw: RawRegional) -> Regional {
    Regional {
        territories: raw
            .territories
            .unwrap_or_default()
            .into_iter()
            .map(|t| Territory {
                territory_name: text(t.territory_name),
                orders: num(t.orders).or(num(t.total_orders)).unwrap_or(0.0),
                revenue: num(t.revenue).unwrap_or(0.0),
                growth: num(t.growth).unwrap_or(0.0),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Forecasting
// ---------------------------------------------------------------------------

pub fn forecasting(raw: RawForecasting) -> Forecasting {
    let quarterly_forecast: Vec<QuarterForecast> = raw
        .quarterly_forecast
        .unwrap_or_default()
        .into_iter()
        .map(|q| QuarterForecast {
            quarter: text(q.quarter),
            predicted_orders: num(q.predicted_orders).or(num(q.orders)).unwrap_or(0.0),
            confidence: num(q.confidence).unwrap_or(0.0),
            revenue: num(q.revenue).unwrap_or(0.0),
            growth: num(q.growth).unwrap_or(0.0),
        })
        .collect();

    let assumptions = match raw.assumptions {
        Some(a) => Assumptions {
            market_growth_rate: num(a.market_growth_rate).unwrap_or(0.0),
            seasonality_factor: a
                .seasonality_factor
                .unwrap_or_else(|| Assumptions::default().seasonality_factor),
        },
        None => Assumptions::default(),
    };

    Forecasting {
        next_quarter_orders: num(raw.next_quarter_orders)
            .or_else(|| quarterly_forecast.first().map(|q| q.predicted_orders))
            .unwrap_or(0.0),
        forecast_growth: num(raw.forecast_growth).unwrap_or(0.0),
        revenue_forecast: num(raw.revenue_forecast).unwrap_or(0.0),
        confidence_level: num(raw.confidence_level).unwrap_or(0.0),
        year_end_projection: num(raw.year_end_projection).unwrap_or(0.0),
        assumptions,
        quarterly_forecast,
    }
}

// ---------------------------------------------------------------------------
// Market intelligence
// ---------------------------------------------------------------------------

pub fn market(raw: RawMarket) -> MarketIntelligence {
    let latest_news = match (raw.latest_news, raw.news) {
        (Some(items), _) => items
            .into_iter()
            .map(|n| {
                let title = text(n.title);
                NewsItem {
                    summary: n.summary.unwrap_or_else(|| title.clone()),
                    title,
                    source: text(n.source),
                    date: text(n.date),
                    importance: text(n.importance),
                }
            })
            .collect(),
        (None, Some(legacy)) => legacy
            .into_iter()
            .map(|n| {
                let title = text(n.title);
                NewsItem {
                    summary: title.clone(),
                    title,
                    source: text(n.source),
                    date: text(n.timestamp),
                    importance: text(n.relevance),
                }
            })
            .collect(),
        (None, None) => Vec::new(),
    };

    let competitor_updates = match (raw.competitor_updates, raw.competitors) {
        (Some(updates), _) => updates
            .into_iter()
            .map(|c| CompetitorUpdate {
                competitor_name: text(c.competitor_name),
                description: text(c.description),
                impact_level: text(c.impact_level),
            })
            .collect(),
        (None, Some(legacy)) => legacy
            .into_iter()
            .map(|c| CompetitorUpdate {
                competitor_name: text(c.name),
                description: text(c.activity),
                impact_level: text(c.impact),
            })
            .collect(),
        (None, None) => Vec::new(),
    };

    let trends = raw.market_trends.unwrap_or_default();
    MarketIntelligence {
        latest_news,
        competitor_updates,
        critical_alerts: raw.critical_alerts.unwrap_or_default(),
        market_trends: MarketTrends {
            market_share: trends
                .market_share
                .unwrap_or_default()
                .into_iter()
                .map(|s| MarketShare {
                    company: text(s.company),
                    share: num(s.share).unwrap_or(0.0),
                })
                .collect(),
            market_size_billions: num(trends.market_size_billions).unwrap_or(0.0),
            growth_rate: num(trends.growth_rate).unwrap_or(0.0),
        },
    }
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

pub fn milestones(raw: RawMilestones) -> Milestones {
    let active_projects: Vec<Project> = match (raw.active_projects, raw.projects) {
        (Some(active), _) => active
            .into_iter()
            .map(|p| Project {
                project_name: text(p.project_name),
                overall_status: p
                    .overall_status
                    .as_deref()
                    .map(ProjectStatus::parse)
                    .unwrap_or_default(),
                completion_percentage: num(p.completion_percentage).unwrap_or(0.0),
                due_date: p.due_date,
                owner: p.owner,
            })
            .collect(),
        (None, Some(legacy)) => legacy
            .into_iter()
            .map(|p| Project {
                project_name: text(p.name),
                overall_status: p
                    .status
                    .as_deref()
                    .map(ProjectStatus::parse)
                    .unwrap_or_default(),
                completion_percentage: num(p.completion).unwrap_or(0.0),
                due_date: p.due_date,
                owner: p.owner,
            })
            .collect(),
        (None, None) => Vec::new(),
    };

    let count = |status: ProjectStatus| {
        active_projects
            .iter()
            .filter(|p| p.overall_status == status)
            .count() as u32
    };
    let counted = |value: Option<Num>, fallback: u32| num(value).map_or(fallback, |n| n as u32);

    Milestones {
        total_projects: counted(raw.total_projects, active_projects.len() as u32),
        projects_on_track: counted(raw.projects_on_track, count(ProjectStatus::OnTrack)),
        projects_at_risk: counted(raw.projects_at_risk, count(ProjectStatus::AtRisk)),
        projects_delayed: counted(raw.projects_delayed, count(ProjectStatus::Delayed)),
        critical_items: raw.critical_items.unwrap_or_default(),
        active_projects,
    }
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// Quote shown when the backend supplies none.
pub fn placeholder_quote() -> StockQuote {
    StockQuote {
        current_price: Price {
            price: 127.45,
            change: 2.35,
            change_percentage: "+1.88".to_string(),
        },
        day_high: 128.90,
        day_low: 125.20,
        volume: 2_450_000.0,
        pe_ratio: 24.5,
        market_cap: "$3.2B".to_string(),
    }
}

pub fn stock(raw: Option<RawStock>) -> StockQuote {
    let Some(raw) = raw else {
        return placeholder_quote();
    };

    let price = raw.current_price.unwrap_or_default();
    let value = num(price.price).unwrap_or(0.0);
    let change = num(price.change).unwrap_or(0.0);
    let change_percentage = match price.change_percentage {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => {
            let pct = n.as_f64().unwrap_or(0.0);
            format!("{}{pct:.2}", if pct >= 0.0 { "+" } else { "" })
        }
        _ => {
            let base = value - change;
            let pct = if base != 0.0 { change / base * 100.0 } else { 0.0 };
            format!("{}{pct:.2}", if pct >= 0.0 { "+" } else { "" })
        }
    };

    StockQuote {
        current_price: Price {
            price: value,
            change,
            change_percentage,
        },
        day_high: num(raw.day_high).unwrap_or(value),
        day_low: num(raw.day_low).unwrap_or(value),
        volume: num(raw.volume).unwrap_or(0.0),
        pe_ratio: num(raw.pe_ratio).unwrap_or(0.0),
        market_cap: raw.market_cap.unwrap_or_else(|| "N/A".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
