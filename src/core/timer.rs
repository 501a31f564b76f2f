use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMER: &str = "default";

#[derive(Debug, Clone, Default)]
struct TimerEntry {
    start: Option<Instant>,
    end: Option<Instant>,
}

/// Named stopwatches, shared by every node built on the same session.
#[derive(Debug, Default)]
pub struct Stopwatch {
    timers: HashMap<String, TimerEntry>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer, clearing any previous stop.
    pub fn start(&mut self, kind: Option<&str>) {
        let entry = self.timers.entry(key(kind)).or_default();
        entry.start = Some(Instant::now());
        entry.end = None;
    }

    /// Stop the timer and return its duration. `None` if it was never started.
    pub fn stop(&mut self, kind: Option<&str>) -> Option<Duration> {
        let entry = self.timers.get_mut(&key(kind))?;
        let start = entry.start?;
        let end = Instant::now();
        entry.end = Some(end);
        Some(end.duration_since(start))
    }

    /// Elapsed time without stopping; zero if the timer was never started.
    pub fn split(&self, kind: Option<&str>) -> Duration {
        self.timers
            .get(&key(kind))
            .and_then(|entry| entry.start)
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    /// Final duration, stopping a still-running timer first.
    pub fn duration(&mut self, kind: Option<&str>) -> Duration {
        let Some(entry) = self.timers.get(&key(kind)) else {
            return Duration::ZERO;
        };
        match (entry.start, entry.end) {
            (Some(start), Some(end)) if end >= start => end.duration_since(start),
            (Some(_), _) => self.stop(kind).unwrap_or_default(),
            (None, _) => Duration::ZERO,
        }
    }

    pub fn reset(&mut self, kind: Option<&str>) {
        self.timers.remove(&key(kind));
    }

    /// Started and not yet stopped.
    pub fn is_running(&self, kind: Option<&str>) -> bool {
        self.timers
            .get(&key(kind))
            .map(|entry| entry.start.is_some() && entry.end.is_none())
            .unwrap_or(false)
    }
}

fn key(kind: Option<&str>) -> String {
    kind.unwrap_or(DEFAULT_TIMER).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_timer_reads_zero() {
        let mut stopwatch = Stopwatch::new();
        assert_eq!(stopwatch.split(Some("page_load")), Duration::ZERO);
        assert_eq!(stopwatch.duration(Some("page_load")), Duration::ZERO);
        assert!(stopwatch.stop(Some("page_load")).is_none());
    }

    #[test]
    fn test_duration_stops_running_timer() {
        let mut stopwatch = Stopwatch::new();
        stopwatch.start(None);
        std::thread::sleep(Duration::from_millis(5));
        let first = stopwatch.duration(None);
        assert!(first >= Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(stopwatch.duration(None), first);
    }

    #[test]
    fn test_timers_are_keyed_by_kind() {
        let mut stopwatch = Stopwatch::new();
        stopwatch.start(Some("a"));
        assert_eq!(stopwatch.split(Some("b")), Duration::ZERO);
        stopwatch.reset(Some("a"));
        assert_eq!(stopwatch.split(Some("a")), Duration::ZERO);
    }

    #[test]
    fn test_is_running() {
        let mut stopwatch = Stopwatch::new();
        assert!(!stopwatch.is_running(None));
        stopwatch.start(None);
        assert!(stopwatch.is_running(None));
        stopwatch.stop(None);
        assert!(!stopwatch.is_running(None));
    }
}
