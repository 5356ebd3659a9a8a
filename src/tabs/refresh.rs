use std::time::{Duration, Instant};

/// Periodic overview/stock refresh timer.
///
/// Time is passed in by the caller so the schedule can be driven by the
/// event loop's clock or by a test.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: Duration,
    enabled: bool,
    last: Option<Instant>,
}

impl RefreshSchedule {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval,
            enabled,
            last: None,
        }
    }

    pub fn from_millis(interval_ms: u64, enabled: bool) -> Self {
        Self::new(Duration::from_millis(interval_ms), enabled)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record that a refresh was dispatched at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Whether a refresh should fire at `now`. Never before the first
    /// [`mark`](Self::mark), since the startup load covers that.
    pub fn is_due(&self, now: Instant) -> bool {
        if !self.enabled || self.interval.is_zero() {
            return false;
        }
        self.last
            .is_some_and(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Time until the next refresh, for the event loop's receive timeout.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if !self.enabled || self.interval.is_zero() {
            return None;
        }
        let last = self.last?;
        Some(self.interval.saturating_sub(now.saturating_duration_since(last)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_after_interval() {
        let start = Instant::now();
        let mut schedule = RefreshSchedule::from_millis(300_000, true);
        assert!(!schedule.is_due(start));
        schedule.mark(start);
        assert!(!schedule.is_due(start + Duration::from_secs(299)));
        assert!(schedule.is_due(start + Duration::from_secs(300)));
    }

    #[test]
    fn disabled_never_due() {
        let start = Instant::now();
        let mut schedule = RefreshSchedule::from_millis(10, false);
        schedule.mark(start);
        assert!(!schedule.is_due(start + Duration::from_secs(60)));
        assert!(schedule.time_until_due(start).is_none());
    }

    #[test]
    fn time_until_due_counts_down() {
        let start = Instant::now();
        let mut schedule = RefreshSchedule::from_millis(1_000, true);
        schedule.mark(start);
        assert_eq!(
            schedule.time_until_due(start + Duration::from_millis(400)),
            Some(Duration::from_millis(600))
        );
        assert_eq!(
            schedule.time_until_due(start + Duration::from_secs(5)),
            Some(Duration::ZERO)
        );
    }
}
