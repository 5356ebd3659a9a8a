//! Composite doughnut charts: bar-of-pie and the two-ring multilevel donut.

use serde::Serialize;

use super::{CartesianFigure, Series, Slice, SliceFigure, cycle_colors, finite_or_zero};

pub const BAR_OF_PIE_PALETTE: [&str; 8] = [
    "#93C5FD", "#86EFAC", "#FCD34D", "#FCA5A5", "#C4B5FD", "#F9A8D4", "#67E8F9", "#FDE68A",
];

pub const INNER_PALETTE: [&str; 6] = [
    "#BFDBFE", "#A7F3D0", "#FDE68A", "#FCA5A5", "#DDD6FE", "#FBCFE8",
];

pub const OUTER_PALETTE: [&str; 6] = [
    "#93C5FD", "#86EFAC", "#FCD34D", "#F87171", "#C4B5FD", "#F9A8D4",
];

/// Doughnut cutout of the multilevel chart, in percent.
pub const MULTILEVEL_CUTOUT: f64 = 45.0;

/// Slices of a series with each value's share of the total.
pub(crate) fn slices(series: &Series, palette: &[&str]) -> SliceFigure {
    let values: Vec<f64> = series
        .values
        .iter()
        .copied()
        .map(finite_or_zero)
        .map(|v| v.max(0.0))
        .collect();
    let total: f64 = values.iter().sum();

    let mut colors = cycle_colors(palette, series.labels.len());
    if let Some(given) = &series.colors {
        for (slot, color) in colors.iter_mut().zip(given) {
            slot.clone_from(color);
        }
    }

    let slices = series
        .labels
        .iter()
        .zip(values)
        .zip(colors)
        .map(|((label, value), color)| Slice {
            label: label.clone(),
            value,
            share: if total > 0.0 { value / total * 100.0 } else { 0.0 },
            color,
        })
        .collect();

    SliceFigure {
        title: series.title.clone(),
        slices,
    }
}

// ---------------------------------------------------------------------------
// Bar of pie
// ---------------------------------------------------------------------------

/// A pie beside a horizontal bar chart that breaks down one of its slices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarOfPieFigure {
    pub pie: SliceFigure,
    /// Index of the broken-out slice, `None` when out of range.
    pub highlighted: Option<usize>,
    pub breakdown: CartesianFigure,
}

impl BarOfPieFigure {
    pub fn new(pie: &Series, breakdown_index: usize, breakdown: &Series) -> Self {
        let mut pie = slices(pie, &BAR_OF_PIE_PALETTE);
        if pie.title.is_none() {
            pie.title = Some("Overview".to_string());
        }
        let highlighted = (breakdown_index < pie.slices.len()).then_some(breakdown_index);

        let mut breakdown_colors = cycle_colors(&BAR_OF_PIE_PALETTE, breakdown.labels.len());
        if let Some(given) = &breakdown.colors {
            for (slot, color) in breakdown_colors.iter_mut().zip(given) {
                slot.clone_from(color);
            }
        }

        Self {
            pie,
            highlighted,
            breakdown: CartesianFigure {
                line: false,
                title: Some(
                    breakdown
                        .title
                        .clone()
                        .unwrap_or_else(|| "Detailed Breakdown".to_string()),
                ),
                points: breakdown
                    .labels
                    .iter()
                    .cloned()
                    .zip(breakdown.values.iter().copied().map(finite_or_zero))
                    .collect(),
                colors: breakdown_colors,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Multilevel donut
// ---------------------------------------------------------------------------

/// Inner and outer rings of equal length; the shorter one is zero-padded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultilevelFigure {
    pub title: String,
    pub cutout: f64,
    pub inner: SliceFigure,
    pub outer: SliceFigure,
}

impl MultilevelFigure {
    pub fn new(inner: &Series, outer: &Series) -> Self {
        let width = inner
            .labels
            .len()
            .max(outer.labels.len())
            .max(inner.values.len())
            .max(outer.values.len());

        let title = outer
            .title
            .clone()
            .or_else(|| inner.title.clone())
            .unwrap_or_else(|| "Multilevel Distribution".to_string());

        Self {
            title,
            cutout: MULTILEVEL_CUTOUT,
            inner: slices(&pad(inner, width), &INNER_PALETTE),
            outer: slices(&pad(outer, width), &OUTER_PALETTE),
        }
    }
}

fn pad(series: &Series, width: usize) -> Series {
    let mut padded = series.clone();
    padded.labels.resize(width, String::new());
    padded.values.resize(width, 0.0);
    padded
}
