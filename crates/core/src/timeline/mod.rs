//! Time sources and deferred work: the clock the controller reads, the queue
//! holding actions due later, and the recurring tick facility.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Monotonic time since an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.micros
            .fetch_add(delta.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.micros.store(at.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Items waiting for a point in time, kept in due order. Items due at the
/// same instant come out in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    entries: Vec<(Duration, T)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Duration, item: T) {
        let index = self.entries.partition_point(|(due, _)| *due <= at);
        self.entries.insert(index, (at, item));
    }

    /// Removes and returns every item due at or before `now`.
    pub fn drain_due(&mut self, now: Duration) -> Vec<T> {
        let split = self.entries.partition_point(|(due, _)| *due <= now);
        self.entries.drain(..split).map(|(_, item)| item).collect()
    }

    /// Removes and returns everything regardless of due time.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.entries.drain(..).map(|(_, item)| item).collect()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.entries.first().map(|(due, _)| *due)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recurring tick facility. Deadlines advance by whole periods from the
/// moment the ticker was armed, so late polling does not shift later ticks.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Duration>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub fn arm(&mut self, now: Duration) {
        self.next = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.next
    }

    /// Number of ticks that fell due up to `now`, consuming them.
    pub fn due(&mut self, now: Duration) -> u32 {
        let mut count = 0;
        if self.period.is_zero() {
            return count;
        }
        while let Some(next) = self.next {
            if next > now {
                break;
            }
            count += 1;
            self.next = Some(next + self.period);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(secs(1.5));

        assert_eq!(other.now(), Duration::from_millis(1500));
        other.set(Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn scheduler_releases_items_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(secs(2.0), "late");
        scheduler.schedule(secs(0.5), "early");
        scheduler.schedule(secs(0.5), "early-second");

        assert_eq!(scheduler.next_due(), Some(secs(0.5)));
        assert!(scheduler.drain_due(secs(0.4)).is_empty());
        assert_eq!(scheduler.drain_due(secs(1.0)), vec!["early", "early-second"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.drain_all(), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn ticker_counts_missed_periods_without_drifting() {
        let mut ticker = Ticker::every_second();
        assert_eq!(ticker.due(secs(5.0)), 0);

        ticker.arm(Duration::ZERO);
        assert_eq!(ticker.due(secs(0.9)), 0);
        assert_eq!(ticker.due(secs(1.2)), 1);
        assert_eq!(ticker.next_deadline(), Some(secs(2.0)));
        assert_eq!(ticker.due(secs(4.0)), 3);
        assert_eq!(ticker.next_deadline(), Some(secs(5.0)));

        ticker.cancel();
        assert!(!ticker.is_armed());
        assert_eq!(ticker.due(secs(10.0)), 0);
    }
}
