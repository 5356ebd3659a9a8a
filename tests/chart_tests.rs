/// Chart binding tests.
///
/// Uses a backend that counts constructions and teardowns, so a leaked
/// chart instance shows up as `created - destroyed > live canvases`.
use std::collections::HashSet;

use anyhow::Result;
use execdash::charts::panels::specs_for;
use execdash::charts::progress_ring::headroom_rings;
use execdash::charts::{
    ChartBackend, ChartBinder, Figure, InstanceId, Series, SeriesSpec, TerminalBackend,
};
use execdash::config::DashboardConfig;
use execdash::normalize::{Section, fallback_payload};

#[derive(Default)]
struct Counting {
    next: u64,
    created: usize,
    destroyed: usize,
}

impl Counting {
    fn alive(&self) -> usize {
        self.created - self.destroyed
    }
}

impl ChartBackend for Counting {
    fn create(&mut self, _canvas: &str, _figure: &Figure) -> Result<InstanceId> {
        self.next += 1;
        self.created += 1;
        Ok(InstanceId(self.next))
    }

    fn destroy(&mut self, _canvas: &str, _instance: InstanceId) {
        self.destroyed += 1;
    }
}

fn rings(values: Vec<f64>, max: f64) -> SeriesSpec {
    let count = values.len();
    let labels: Vec<String> = (0..count).map(|i| format!("r{i}")).collect();
    SeriesSpec::ProgressRing(Series::new(labels, values).with_max(vec![max; count]))
}

// ---------------------------------------------------------------------------
// Binding lifecycle
// ---------------------------------------------------------------------------

#[test]
fn repeated_rebinds_leave_one_live_instance() {
    let mut binder = ChartBinder::new(Counting::default());
    let mut handle = binder.bind("labTatChart", &rings(vec![10.0], 20.0)).unwrap();
    for n in 0..25 {
        handle = binder
            .rebind(handle, &rings(vec![f64::from(n)], 20.0))
            .unwrap();
    }

    assert_eq!(binder.live_count("labTatChart"), 1);
    assert_eq!(binder.backend().alive(), 1);
    assert_eq!(binder.backend().created, 26);
}

#[test]
fn binding_a_canvas_twice_without_handle_still_destroys_first() {
    let mut binder = ChartBinder::new(Counting::default());
    let _first = binder.bind("costsChart", &rings(vec![1.0], 2.0)).unwrap();
    let _second = binder.bind("costsChart", &rings(vec![1.5], 2.0)).unwrap();
    assert_eq!(binder.backend().alive(), 1);
}

#[test]
fn releasing_a_superseded_handle_keeps_newer_chart() {
    let mut binder = ChartBinder::new(TerminalBackend::new());
    let old = binder.bind("regionChart", &rings(vec![1.0], 2.0)).unwrap();
    let _new = binder.bind("regionChart", &rings(vec![2.0], 2.0)).unwrap();

    binder.release(old);
    assert_eq!(binder.live_count("regionChart"), 1);
    assert!(binder.backend().frame("regionChart").is_some());
}

#[test]
fn every_fallback_tab_binds_cleanly() {
    let config = DashboardConfig::default();
    let mut binder = ChartBinder::new(TerminalBackend::new());
    let mut canvases = HashSet::new();

    for section in [
        Section::Overview,
        Section::Orders,
        Section::Compliance,
        Section::Reimbursement,
        Section::Costs,
        Section::Lab,
        Section::Regional,
        Section::Forecasting,
        Section::Milestones,
    ] {
        let charts = specs_for(&fallback_payload(section), &config);
        assert!(!charts.is_empty(), "{section} has no charts");
        for chart in charts {
            binder.bind(&chart.canvas, &chart.spec).unwrap();
            assert!(canvases.insert(chart.canvas.clone()), "duplicate canvas {}", chart.canvas);
        }
    }

    assert_eq!(binder.live_total(), canvases.len());
    assert_eq!(binder.backend().live_instances(), canvases.len());

    binder.clear();
    assert_eq!(binder.live_total(), 0);
    assert_eq!(binder.backend().live_instances(), 0);
}

// ---------------------------------------------------------------------------
// Ring geometry
// ---------------------------------------------------------------------------

#[test]
fn zero_max_gives_zero_percentage() {
    let Figure::Rings(figure) = rings(vec![50.0, 0.0], 0.0).figure() else {
        panic!("a progress ring must produce rings");
    };
    for ring in &figure.rings {
        assert_eq!(ring.percentage, 0.0);
    }
}

#[test]
fn all_zero_series_has_zero_headroom() {
    let series = headroom_rings([("Jan", 0.0), ("Feb", 0.0)], "Empty", "Jan");
    assert_eq!(series.max_values, Some(vec![0.0, 0.0]));

    let Figure::Rings(figure) = SeriesSpec::ProgressRing(series).figure() else {
        panic!("a progress ring must produce rings");
    };
    assert!(figure.rings.iter().all(|r| r.percentage == 0.0));
}

#[test]
fn headroom_rings_fill_below_full() {
    let series = headroom_rings([("Q1", 50.0), ("Q2", 100.0)], "Orders", "Q1");
    let Figure::Rings(figure) = SeriesSpec::ProgressRing(series).figure() else {
        panic!("a progress ring must produce rings");
    };
    let largest = figure
        .rings
        .iter()
        .map(|r| r.percentage)
        .fold(0.0_f64, f64::max);
    assert!((largest - 100.0 / 1.2).abs() < 1e-9);
    assert_eq!(figure.center_value.as_deref(), Some("50"));
}
