/// Result of feeding one tick to a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown is not running; nothing changed.
    Idle,
    /// Still counting, with this many seconds left.
    Counting(u32),
    /// The last second elapsed. The countdown has halted at zero.
    Expired,
}

/// Session countdown in whole seconds. Each tick counts as exactly one
/// second; there is no wall-clock correction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, total_seconds: u32) {
        self.remaining = total_seconds;
        self.running = true;
    }

    /// Stops counting but keeps the remaining time.
    pub fn halt(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Stops counting and zeroes the remaining time.
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = 0;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        if self.remaining <= 1 {
            self.reset();
            return TickOutcome::Expired;
        }
        self.remaining -= 1;
        TickOutcome::Counting(self.remaining)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Formats seconds as `m:ss`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_on_last_second() {
        let mut countdown = Countdown::new();
        countdown.start(3);

        assert_eq!(countdown.tick(), TickOutcome::Counting(2));
        assert_eq!(countdown.tick(), TickOutcome::Counting(1));
        assert_eq!(countdown.tick(), TickOutcome::Expired);
        assert_eq!(countdown.remaining(), 0);
        assert!(!countdown.is_running());
        assert_eq!(countdown.tick(), TickOutcome::Idle);
    }

    #[test]
    fn halt_preserves_remaining() {
        let mut countdown = Countdown::new();
        countdown.start(60);
        countdown.tick();
        countdown.halt();

        assert_eq!(countdown.tick(), TickOutcome::Idle);
        assert_eq!(countdown.remaining(), 59);

        countdown.resume();
        assert_eq!(countdown.tick(), TickOutcome::Counting(58));

        countdown.reset();
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(1200), "20:00");
    }
}
