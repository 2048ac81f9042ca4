use std::cell::Cell;
use std::time::{Duration, Instant};

/// Time source for the search deadline.
///
/// The search only ever asks how long it has been running, which lets tests
/// replace wall-clock time with a scripted one.
pub trait SearchClock {
    fn elapsed(&self) -> Duration;
}

/// Monotonic wall clock started at construction.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl SearchClock for WallClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that never advances; the deadline never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrozenClock;

impl SearchClock for FrozenClock {
    fn elapsed(&self) -> Duration {
        Duration::ZERO
    }
}

/// Clock that advances by a fixed step every time it is read.
#[derive(Debug, Default)]
pub struct SteppingClock {
    step: Duration,
    now: Cell<Duration>,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            now: Cell::new(Duration::ZERO),
        }
    }
}

impl SearchClock for SteppingClock {
    fn elapsed(&self) -> Duration {
        let now = self.now.get() + self.step;
        self.now.set(now);
        now
    }
}
