//! System tick sources.

use std::cell::Cell;
use std::fmt::Debug;
use std::time::Instant;

/// System tick count. Wraps around; compare ticks with [elapsed] only.
pub type Ticks = u32;

/// Ticks from `since` to `now`, tolerating one wraparound.
pub fn elapsed(now: Ticks, since: Ticks) -> Ticks {
    now.wrapping_sub(since)
}

/// A monotonically increasing tick counter.
pub trait TickClock: Debug {
    fn ticks(&self) -> Ticks;
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Ticks>,
}

impl ManualClock {
    pub fn new(start: Ticks) -> Self {
        ManualClock { now: Cell::new(start) }
    }

    pub fn set(&self, now: Ticks) {
        self.now.set(now);
    }

    pub fn advance(&self, ticks: Ticks) {
        self.now.set(self.now.get().wrapping_add(ticks));
    }
}

impl TickClock for ManualClock {
    fn ticks(&self) -> Ticks {
        self.now.get()
    }
}

/// Milliseconds since the clock was created, one tick per millisecond.
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for MonotonicClock {
    fn ticks(&self) -> Ticks {
        // Truncation is the wraparound.
        self.start.elapsed().as_millis() as Ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_wraparound() {
        assert_eq!(elapsed(5, Ticks::MAX - 4), 10);
        assert_eq!(elapsed(100, 40), 60);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Ticks::MAX);
        clock.advance(2);
        assert_eq!(clock.ticks(), 1);
        clock.set(42);
        assert_eq!(clock.ticks(), 42);
    }
}
