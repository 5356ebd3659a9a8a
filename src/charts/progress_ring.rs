//! Progress rings: concentric doughnuts, one per value, each showing the
//! value as a percentage of its own maximum.

use serde::Serialize;

use super::{Series, finite_or_zero};
use crate::config::schema::MetricDisplay;

/// Headroom multiplier applied to the largest value when a ring group has
/// no explicit maximum.
pub const HEADROOM: f64 = 1.2;

/// Percentage of `max` that `value` fills, clamped to `0..=100`.
///
/// A missing max reads as 100. Zero, negative or non-finite inputs give 0.
pub fn ring_percentage(value: f64, max: Option<f64>) -> f64 {
    let max = max.unwrap_or(100.0);
    if !value.is_finite() || !max.is_finite() || max <= 0.0 {
        return 0.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

/// `1.2 ×` the largest value, or 0 for an empty or all-zero series.
pub fn headroom_max(values: &[f64]) -> f64 {
    let largest = values
        .iter()
        .copied()
        .map(finite_or_zero)
        .fold(0.0_f64, f64::max);
    largest * HEADROOM
}

/// Group thousands with commas: `245680` becomes `245,680`.
pub fn format_thousands(value: f64) -> String {
    let value = finite_or_zero(value);
    let fixed = format!("{:.2}", value.abs());
    let (whole, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    let decimals = decimals.trim_end_matches('0');
    if decimals.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{decimals}")
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ring {
    pub label: String,
    pub value: f64,
    pub max: f64,
    pub percentage: f64,
    pub color: String,
    /// Inner cutout of this ring as a percentage of the chart radius.
    pub cutout: f64,
}

impl Ring {
    /// Hover text: `value / max (pct%)`.
    pub fn tooltip(&self) -> String {
        format!(
            "{}: {} / {} ({:.1}%)",
            self.label,
            format_thousands(self.value),
            format_thousands(self.max),
            self.percentage
        )
    }
}

/// Rings ordered outer to inner, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingFigure {
    pub title: Option<String>,
    pub rings: Vec<Ring>,
    pub center_value: Option<String>,
    pub center_label: Option<String>,
}

/// Cutout of the outermost ring, and the most any ring may reach.
const FIRST_CUTOUT: f64 = 35.0;
const MAX_CUTOUT: f64 = 95.0;
const CUTOUT_STEP: f64 = 15.0;

/// Cutout step for `count` rings: the usual step, narrowed so the
/// innermost ring still stays within [`MAX_CUTOUT`].
fn cutout_step(count: usize) -> f64 {
    if count < 2 {
        return CUTOUT_STEP;
    }
    CUTOUT_STEP.min((MAX_CUTOUT - FIRST_CUTOUT) / (count - 1) as f64)
}

impl RingFigure {
    pub fn from_series(series: &Series) -> Self {
        let colors = series.resolved_colors();
        let step = cutout_step(series.labels.len().min(series.values.len()));
        let rings = series
            .labels
            .iter()
            .zip(&series.values)
            .enumerate()
            .map(|(i, (label, &value))| {
                let max = series
                    .max_values
                    .as_ref()
                    .and_then(|maxes| maxes.get(i).copied());
                Ring {
                    label: label.clone(),
                    value: finite_or_zero(value),
                    max: max.map(finite_or_zero).unwrap_or(100.0),
                    percentage: ring_percentage(value, max),
                    color: colors[i].clone(),
                    cutout: FIRST_CUTOUT + i as f64 * step,
                }
            })
            .collect::<Vec<_>>();

        let center_value = rings.first().map(|ring| format_thousands(ring.value));

        Self {
            title: series.title.clone(),
            rings,
            center_value,
            center_label: series.center_label.clone(),
        }
    }

    /// Rings in draw order: innermost first so outer rings paint on top.
    pub fn draw_order(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().rev()
    }
}

// ---------------------------------------------------------------------------
// Ring builders
// ---------------------------------------------------------------------------

/// Rings for `(label, value)` pairs sharing one `1.2 ×` headroom max.
pub fn headroom_rings<L: Into<String>>(
    points: impl IntoIterator<Item = (L, f64)>,
    title: &str,
    center_label: &str,
) -> Series {
    let (labels, values): (Vec<String>, Vec<f64>) = points
        .into_iter()
        .map(|(label, value)| (label.into(), value))
        .unzip();
    let max = headroom_max(&values);
    let count = values.len();
    Series::new(labels, values)
        .with_max(vec![max; count])
        .with_title(title)
        .with_center_label(center_label)
}

/// Rings for a metric card: the first three base values.
pub fn metric_rings(metric: &MetricDisplay) -> Series {
    let [day, week, month, _quarter] = metric.base_values.as_array();
    headroom_rings(
        [("Day", day), ("Week", week), ("Month", month)],
        &metric.label,
        "Day",
    )
    .with_colors(vec![metric.color.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_is_zero_percent() {
        assert_eq!(ring_percentage(50.0, Some(0.0)), 0.0);
        assert_eq!(ring_percentage(0.0, Some(0.0)), 0.0);
    }

    #[test]
    fn non_finite_inputs_are_zero_percent() {
        assert_eq!(ring_percentage(f64::NAN, Some(10.0)), 0.0);
        assert_eq!(ring_percentage(f64::INFINITY, Some(10.0)), 0.0);
        assert_eq!(ring_percentage(5.0, Some(f64::NAN)), 0.0);
    }

    #[test]
    fn percentage_is_capped_at_100() {
        assert_eq!(ring_percentage(150.0, Some(100.0)), 100.0);
        assert_eq!(ring_percentage(25.0, Some(50.0)), 50.0);
        assert_eq!(ring_percentage(-5.0, Some(50.0)), 0.0);
    }

    #[test]
    fn missing_max_means_hundred() {
        assert_eq!(ring_percentage(40.0, None), 40.0);
    }

    #[test]
    fn all_zero_series_has_zero_headroom_and_zero_percentages() {
        let series = headroom_rings([("a", 0.0), ("b", 0.0)], "t", "c");
        let figure = RingFigure::from_series(&series);
        assert!(figure.rings.iter().all(|ring| ring.percentage == 0.0));
        assert!(figure.rings.iter().all(|ring| ring.max == 0.0));
    }

    #[test]
    fn rings_keep_input_order_and_grow_cutout() {
        let series = headroom_rings([("Jan", 100.0), ("Feb", 50.0)], "Trend", "Jan");
        let figure = RingFigure::from_series(&series);
        assert_eq!(figure.rings[0].label, "Jan");
        assert_eq!(figure.rings[0].cutout, 35.0);
        assert_eq!(figure.rings[1].cutout, 50.0);
        assert_eq!(figure.draw_order().next().map(|r| r.label.as_str()), Some("Feb"));
        assert_eq!(figure.center_value.as_deref(), Some("100"));
    }

    #[test]
    fn many_rings_keep_cutout_within_the_chart() {
        let months = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul"];
        let series = headroom_rings(months.iter().map(|m| (*m, 10.0)), "Year", "Jan");
        let figure = RingFigure::from_series(&series);

        let cutouts: Vec<f64> = figure.rings.iter().map(|ring| ring.cutout).collect();
        assert_eq!(cutouts[0], 35.0);
        assert!((cutouts[6] - 95.0).abs() < 1e-9);
        assert!(cutouts.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn headroom_is_one_point_two_of_largest() {
        assert!((headroom_max(&[10.0, 50.0, 20.0]) - 60.0).abs() < 1e-9);
        assert_eq!(headroom_max(&[]), 0.0);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(format_thousands(245_680.0), "245,680");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1_000_000.0), "1,000,000");
        assert_eq!(format_thousands(-1_234.0), "-1,234");
        assert_eq!(format_thousands(32.45), "32.45");
    }

    #[test]
    fn metric_rings_use_first_three_base_values() {
        let config = crate::config::schema::DashboardConfig::default();
        let series = metric_rings(&config.metric("orders"));
        assert_eq!(series.labels, vec!["Day", "Week", "Month"]);
        assert_eq!(series.values.len(), 3);
        let largest = series.values.iter().copied().fold(0.0, f64::max);
        assert_eq!(series.max_values, Some(vec![largest * HEADROOM; 3]));
    }

    #[test]
    fn tooltip_shows_value_over_max() {
        let series = Series::new(["Jan"], vec![50.0]).with_max(vec![200.0]);
        let figure = RingFigure::from_series(&series);
        assert_eq!(figure.rings[0].tooltip(), "Jan: 50 / 200 (25.0%)");
    }
}
