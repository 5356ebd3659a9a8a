//! Chart binding.
//!
//! A [`SeriesSpec`] describes what to draw; [`Figure`] is the computed
//! geometry handed to a [`ChartBackend`]. [`ChartBinder`] owns the mapping
//! from canvas id to the one live chart instance on it: binding a canvas
//! always destroys whatever instance is already there, and rebinding
//! consumes the old [`ChartHandle`].

pub mod composite;
pub mod panels;
pub mod progress_ring;
pub mod terminal;

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use composite::{BarOfPieFigure, MultilevelFigure};
pub use progress_ring::RingFigure;
pub use terminal::TerminalBackend;

/// Colors cycled by index when a series supplies none.
pub const PALETTE: [&str; 6] = [
    "#93C5FD", "#86EFAC", "#FCD34D", "#C4B5FD", "#F9A8D4", "#67E8F9",
];

/// `count` colors from `palette`, repeating it as needed.
pub fn cycle_colors(palette: &[&str], count: usize) -> Vec<String> {
    if palette.is_empty() {
        return vec![String::new(); count];
    }
    (0..count)
        .map(|i| palette[i % palette.len()].to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Series specs
// ---------------------------------------------------------------------------

/// One labeled numeric series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Caption under the center value of a progress ring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_label: Option<String>,
}

impl Series {
    pub fn new<L: Into<String>>(labels: impl IntoIterator<Item = L>, values: Vec<f64>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            values,
            ..Self::default()
        }
    }

    pub fn with_max(mut self, max_values: Vec<f64>) -> Self {
        self.max_values = Some(max_values);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_center_label(mut self, label: impl Into<String>) -> Self {
        self.center_label = Some(label.into());
        self
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Supplied colors, padded from [`PALETTE`] to one per label.
    pub fn resolved_colors(&self) -> Vec<String> {
        let mut colors = cycle_colors(&PALETTE, self.labels.len());
        if let Some(given) = &self.colors {
            for (slot, color) in colors.iter_mut().zip(given) {
                slot.clone_from(color);
            }
        }
        colors
    }
}

/// What to draw on a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SeriesSpec {
    ProgressRing(Series),
    Bar(Series),
    Line(Series),
    Doughnut(Series),
    /// A pie with one slice broken out into a bar chart.
    BarOfPie {
        pie: Series,
        breakdown_index: usize,
        breakdown: Series,
    },
    /// Two concentric donut rings.
    MultilevelDonut { inner: Series, outer: Series },
}

impl SeriesSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProgressRing(_) => "progress-ring",
            Self::Bar(_) => "bar",
            Self::Line(_) => "line",
            Self::Doughnut(_) => "doughnut",
            Self::BarOfPie { .. } => "bar-of-pie",
            Self::MultilevelDonut { .. } => "multilevel-donut",
        }
    }

    /// Compute the geometry for this spec.
    pub fn figure(&self) -> Figure {
        match self {
            Self::ProgressRing(series) => Figure::Rings(RingFigure::from_series(series)),
            Self::Bar(series) => Figure::Cartesian(CartesianFigure::from_series(series, false)),
            Self::Line(series) => Figure::Cartesian(CartesianFigure::from_series(series, true)),
            Self::Doughnut(series) => Figure::Doughnut(composite::slices(series, &PALETTE)),
            Self::BarOfPie {
                pie,
                breakdown_index,
                breakdown,
            } => Figure::BarOfPie(BarOfPieFigure::new(pie, *breakdown_index, breakdown)),
            Self::MultilevelDonut { inner, outer } => {
                Figure::Multilevel(MultilevelFigure::new(inner, outer))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Figures
// ---------------------------------------------------------------------------

/// Bar or line chart over labeled points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartesianFigure {
    pub line: bool,
    pub title: Option<String>,
    pub points: Vec<(String, f64)>,
    pub colors: Vec<String>,
}

impl CartesianFigure {
    fn from_series(series: &Series, line: bool) -> Self {
        Self {
            line,
            title: series.title.clone(),
            points: series
                .labels
                .iter()
                .cloned()
                .zip(series.values.iter().copied().map(finite_or_zero))
                .collect(),
            colors: series.resolved_colors(),
        }
    }
}

/// A labeled share of a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    /// Share of the series total, 0 when the total is 0.
    pub share: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceFigure {
    pub title: Option<String>,
    pub slices: Vec<Slice>,
}

/// Geometry handed to a chart backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "figure", rename_all = "snake_case")]
pub enum Figure {
    Rings(RingFigure),
    Cartesian(CartesianFigure),
    Doughnut(SliceFigure),
    BarOfPie(BarOfPieFigure),
    Multilevel(MultilevelFigure),
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Backend and binder
// ---------------------------------------------------------------------------

/// Identifier of one chart instance inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceId(pub u64);

/// The charting library.
pub trait ChartBackend {
    /// Construct a chart on `canvas`.
    fn create(&mut self, canvas: &str, figure: &Figure) -> Result<InstanceId>;
    /// Tear down an instance and release its canvas resources.
    fn destroy(&mut self, canvas: &str, instance: InstanceId);
}

/// Proof of a live chart on one canvas. Not cloneable: rebinding or
/// releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct ChartHandle {
    canvas: String,
    instance: InstanceId,
}

impl ChartHandle {
    pub fn canvas(&self) -> &str {
        &self.canvas
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}

/// Tracks the single live instance per canvas.
pub struct ChartBinder<B: ChartBackend> {
    backend: B,
    live: HashMap<String, InstanceId>,
}

impl<B: ChartBackend> ChartBinder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Draw `spec` on `canvas`, destroying any instance already there.
    pub fn bind(&mut self, canvas: &str, spec: &SeriesSpec) -> Result<ChartHandle> {
        if let Some(previous) = self.live.remove(canvas) {
            debug!(canvas, instance = previous.0, "destroying previous chart");
            self.backend.destroy(canvas, previous);
        }

        let instance = self.backend.create(canvas, &spec.figure())?;
        self.live.insert(canvas.to_string(), instance);
        debug!(canvas, kind = spec.kind(), instance = instance.0, "chart bound");

        Ok(ChartHandle {
            canvas: canvas.to_string(),
            instance,
        })
    }

    /// Replace the chart behind `handle` with one drawn from `spec`.
    pub fn rebind(&mut self, handle: ChartHandle, spec: &SeriesSpec) -> Result<ChartHandle> {
        self.bind(&handle.canvas, spec)
    }

    /// Destroy the chart behind `handle`. A handle already superseded by a
    /// later bind on the same canvas leaves the newer chart alone.
    pub fn release(&mut self, handle: ChartHandle) {
        if self.live.get(&handle.canvas) == Some(&handle.instance) {
            self.live.remove(&handle.canvas);
            self.backend.destroy(&handle.canvas, handle.instance);
        }
    }

    /// Destroy every live chart.
    pub fn clear(&mut self) {
        for (canvas, instance) in self.live.drain() {
            self.backend.destroy(&canvas, instance);
        }
    }

    /// Live instances on `canvas`: 0 or 1.
    pub fn live_count(&self, canvas: &str) -> usize {
        usize::from(self.live.contains_key(canvas))
    }

    pub fn live_total(&self) -> usize {
        self.live.len()
    }
}
