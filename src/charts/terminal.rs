//! Text rendering of figures for the CLI.
//!
//! Each live instance keeps its rendered text; the CLI prints whatever is
//! live after a tab load. Destroying an instance drops its text.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::{ColoredString, Colorize};

use super::{ChartBackend, Figure, InstanceId, Slice};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Default)]
pub struct TerminalBackend {
    next: u64,
    frames: BTreeMap<String, (InstanceId, String)>,
}

impl TerminalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered text of the live chart on `canvas`.
    pub fn frame(&self, canvas: &str) -> Option<&str> {
        self.frames.get(canvas).map(|(_, text)| text.as_str())
    }

    /// `(canvas, text)` for every live chart, ordered by canvas id.
    pub fn frames(&self) -> impl Iterator<Item = (&str, &str)> {
        self.frames
            .iter()
            .map(|(canvas, (_, text))| (canvas.as_str(), text.as_str()))
    }

    pub fn live_instances(&self) -> usize {
        self.frames.len()
    }
}

impl ChartBackend for TerminalBackend {
    fn create(&mut self, canvas: &str, figure: &Figure) -> Result<InstanceId> {
        self.next += 1;
        let id = InstanceId(self.next);
        self.frames
            .insert(canvas.to_string(), (id, render(canvas, figure)));
        Ok(id)
    }

    fn destroy(&mut self, canvas: &str, instance: InstanceId) {
        if self
            .frames
            .get(canvas)
            .is_some_and(|(live, _)| *live == instance)
        {
            self.frames.remove(canvas);
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a figure as colored text lines.
pub fn render(canvas: &str, figure: &Figure) -> String {
    let mut out = Vec::new();
    match figure {
        Figure::Rings(rings) => {
            out.push(heading(rings.title.as_deref().unwrap_or(canvas)));
            for ring in &rings.rings {
                out.push(format!(
                    "  {:<14} {} {:>5.1}%",
                    ring.label,
                    paint(&bar(ring.percentage, 100.0), &ring.color),
                    ring.percentage
                ));
            }
            if let Some(value) = &rings.center_value {
                let label = rings.center_label.as_deref().unwrap_or("");
                out.push(format!("  {} {}", value.bold(), label.dimmed()));
            }
        }
        Figure::Cartesian(chart) => {
            out.push(heading(chart.title.as_deref().unwrap_or(canvas)));
            let scale = chart
                .points
                .iter()
                .map(|(_, v)| v.abs())
                .fold(0.0_f64, f64::max);
            for ((label, value), color) in chart.points.iter().zip(&chart.colors) {
                out.push(format!(
                    "  {:<14} {} {:.2}",
                    label,
                    paint(&bar(value.abs(), scale), color),
                    value
                ));
            }
        }
        Figure::Doughnut(pie) => {
            out.push(heading(pie.title.as_deref().unwrap_or(canvas)));
            out.extend(pie.slices.iter().map(|slice| slice_line(slice, false)));
        }
        Figure::BarOfPie(figure) => {
            out.push(heading(figure.pie.title.as_deref().unwrap_or(canvas)));
            for (i, slice) in figure.pie.slices.iter().enumerate() {
                out.push(slice_line(slice, figure.highlighted == Some(i)));
            }
            let breakdown = Figure::Cartesian(figure.breakdown.clone());
            out.push(render(canvas, &breakdown));
        }
        Figure::Multilevel(figure) => {
            out.push(heading(&figure.title));
            out.push(format!("  {}", "inner".dimmed()));
            out.extend(figure.inner.slices.iter().map(|s| slice_line(s, false)));
            out.push(format!("  {}", "outer".dimmed()));
            out.extend(figure.outer.slices.iter().map(|s| slice_line(s, false)));
        }
    }
    out.join("\n")
}

fn heading(title: &str) -> String {
    format!("{}", title.bold().cyan())
}

fn slice_line(slice: &Slice, highlighted: bool) -> String {
    let marker = if highlighted { "▶" } else { " " };
    format!(
        " {marker}{:<14} {} {:>5.1}%",
        slice.label,
        paint(&bar(slice.share, 100.0), &slice.color),
        slice.share
    )
}

fn bar(value: f64, scale: f64) -> String {
    let filled = if scale > 0.0 && value.is_finite() {
        ((value / scale).clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize
    } else {
        0
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn paint(text: &str, hex: &str) -> ColoredString {
    match parse_hex(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartBinder, Series, SeriesSpec};

    #[test]
    fn parse_hex_colors() {
        assert_eq!(parse_hex("#93C5FD"), Some((0x93, 0xC5, 0xFD)));
        assert_eq!(parse_hex("93C5FD"), None);
        assert_eq!(parse_hex("#FFF"), None);
    }

    #[test]
    fn bar_fill_is_proportional() {
        assert_eq!(bar(50.0, 100.0).chars().filter(|c| *c == '█').count(), 15);
        assert_eq!(bar(5.0, 0.0).chars().filter(|c| *c == '█').count(), 0);
    }

    #[test]
    fn rebinding_keeps_one_frame_per_canvas() {
        let mut binder = ChartBinder::new(TerminalBackend::new());
        let spec = SeriesSpec::Bar(Series::new(["a", "b"], vec![1.0, 2.0]).with_title("Test"));
        let mut handle = binder.bind("canvas", &spec).unwrap();
        for _ in 0..5 {
            handle = binder.rebind(handle, &spec).unwrap();
        }
        assert_eq!(binder.backend().live_instances(), 1);
        assert!(binder.backend().frame("canvas").unwrap().contains("Test"));
        binder.release(handle);
        assert_eq!(binder.backend().live_instances(), 0);
    }

    #[test]
    fn renders_every_figure_kind() {
        let series = Series::new(["x", "y"], vec![3.0, 1.0]);
        let specs = [
            SeriesSpec::ProgressRing(series.clone().with_max(vec![4.0, 4.0])),
            SeriesSpec::Line(series.clone()),
            SeriesSpec::Doughnut(series.clone()),
            SeriesSpec::BarOfPie {
                pie: series.clone(),
                breakdown_index: 0,
                breakdown: series.clone(),
            },
            SeriesSpec::MultilevelDonut {
                inner: series.clone(),
                outer: series,
            },
        ];
        for spec in specs {
            let text = render("c", &spec.figure());
            assert!(text.contains('x'), "{}", spec.kind());
        }
    }
}
