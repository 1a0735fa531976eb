//! Fixed real-time cadence for host loops.

use std::{
    thread,
    time::{Duration, Instant},
};

/// Sleeps until the next tick deadline. Deadlines advance by a fixed period so short
/// oversleeps don't accumulate; a loop that falls more than a period behind resyncs.
pub struct Pacer {
    period: Duration,
    next: Instant,
}

impl Pacer {
    /// `rate_hz` ticks per second. NTSC is ~60.0988; 60 is close enough for pacing.
    pub fn new(rate_hz: f64) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            60.0
        };
        let period = Duration::from_secs_f64(1.0 / rate_hz);
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until the current deadline, then schedule the next one.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else if now - self.next > self.period {
            self.next = now + self.period;
        } else {
            self.next += self.period;
        }
    }
}
