use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time source driving the layout's per-call deadlines.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
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
        self.epoch.elapsed()
    }
}

/// Deterministic clock that advances by a fixed tick every time it is read.
#[derive(Debug, Clone, Default)]
pub struct StepClock {
    now: Cell<Duration>,
    tick: Duration,
}

impl StepClock {
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            tick,
        }
    }

    /// Moves time forward without a reading.
    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get().saturating_add(dt));
    }

    /// The time the next reading will return.
    pub fn peek(&self) -> Duration {
        self.now.get()
    }
}

impl Clock for StepClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now.saturating_add(self.tick));
        now
    }
}
