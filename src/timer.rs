//! Performance measurement tools.

use std::{
    cell::Cell,
    fmt,
    time::{Duration, Instant},
};

/// A timer that can measure and accumulate the time an operation takes.
///
/// Timing is observational only and never affects pipeline behavior. Recorded times are reported
/// as floating-point milliseconds.
pub struct Timer {
    name: &'static str,
    total: Cell<Duration>,
    count: Cell<usize>,
    last: Cell<Duration>,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            total: Cell::new(Duration::ZERO),
            count: Cell::new(0),
            last: Cell::new(Duration::ZERO),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&self, start: Instant) {
        let duration = start.elapsed();
        self.total.set(self.total.get() + duration);
        self.count.set(self.count.get() + 1);
        self.last.set(duration);
    }

    /// Returns the most recently recorded time, in milliseconds.
    pub fn last_ms(&self) -> f64 {
        self.last.get().as_secs_f64() * 1000.0
    }

    /// Returns the sum of all recorded times, in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.total.get().as_secs_f64() * 1000.0
    }

    /// Returns the number of recorded measurements.
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

/// Displays the number of measurements and their average time.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count.get();
        let avg_ms = if count == 0 {
            0.0
        } else {
            self.total_ms() / count as f64
        };
        write!(f, "{}: {count}x{avg_ms:.1}ms", self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_measurement() {
        let timer = Timer::new("test");
        timer.time(|| std::thread::sleep(Duration::from_millis(2)));
        timer.time(|| ());

        assert_eq!(timer.count(), 2);
        assert!(timer.total_ms() >= 2.0);
        assert!(timer.last_ms() <= timer.total_ms());
    }

    #[test]
    fn display_reports_count_and_average() {
        let timer = Timer::new("infer");
        assert_eq!(timer.to_string(), "infer: 0x0.0ms");
        timer.time(|| ());
        assert!(timer.to_string().starts_with("infer: 1x"));
    }
}
