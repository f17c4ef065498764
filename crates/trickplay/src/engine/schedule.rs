use std::time::Duration;

/// Fixed-interval repeating timer driven by `advance(dt)`.
///
/// The owner keeps it in an `Option`; replacing it cancels the old one, so
/// at most one loop is ever live.
#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    interval: Duration,
    elapsed: Duration,
    fired: u64,
}

impl RepeatingTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks fired since the timer started.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Accumulate `dt` and return how many ticks became due.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        self.elapsed += dt;
        let mut due = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            self.fired += 1;
            due += 1;
        }
        due
    }
}

/// One-shot deadline driven by `advance(dt)`.
#[derive(Debug, Clone)]
pub struct Timeout {
    remaining: Duration,
}

impl Timeout {
    pub fn new(after: Duration) -> Self {
        Self { remaining: after }
    }

    /// Push the deadline out to `after` from now.
    pub fn restart(&mut self, after: Duration) {
        self.remaining = after;
    }

    /// Returns true once the deadline has passed.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        self.remaining.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_per_interval() {
        let mut timer = RepeatingTimer::new(Duration::from_millis(1000));
        assert_eq!(timer.advance(Duration::from_millis(999)), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(timer.advance(Duration::from_millis(2500)), 2);
        assert_eq!(timer.fired(), 3);
        // 500ms left over from the last advance
        assert_eq!(timer.advance(Duration::from_millis(500)), 1);
    }

    #[test]
    fn zero_interval_never_fires() {
        let mut timer = RepeatingTimer::new(Duration::ZERO);
        assert_eq!(timer.advance(Duration::from_secs(10)), 0);
    }

    #[test]
    fn timeout_expires_and_restarts() {
        let mut timeout = Timeout::new(Duration::from_millis(1000));
        assert!(!timeout.advance(Duration::from_millis(600)));
        timeout.restart(Duration::from_millis(1000));
        assert!(!timeout.advance(Duration::from_millis(600)));
        assert!(timeout.advance(Duration::from_millis(400)));
    }
}
