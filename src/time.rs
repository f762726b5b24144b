//! # Time source
//!
//! A monotonic millisecond clock driven by a timer interrupt, plus the
//! idle-until-wake primitive the scheduler calls between iterations.
//! Ported from `Time.cpp`: the original increments a file-static counter
//! from `TIMER1_COMPA_vect` and reads it from main context inside an
//! `ATOMIC_BLOCK`; here `Clock::tick` is called from the SysTick handler
//! (see `arch::cortex_m4::SysTick`) and `now` reads under
//! `sync::critical_section`.

use crate::sync;
use crate::trace::{Trace, TraceSink};
use core::cell::Cell;

/// Holds the millisecond counter. Not `Sync` on its own (`Cell` isn't);
/// every access goes through `sync::critical_section`, matching the
/// original's `ATOMIC_BLOCK` discipline.
pub struct Clock {
    millis: Cell<i64>,
}

unsafe impl Sync for Clock {}

impl Clock {
    pub const fn new() -> Self {
        Self { millis: Cell::new(0) }
    }

    /// Called once per millisecond from the SysTick handler.
    pub fn tick(&self) {
        self.millis.set(self.millis.get() + 1);
    }

    /// Current time in milliseconds, read under a critical section.
    pub fn now(&self) -> i64 {
        sync::critical_section(|_cs| self.millis.get())
    }
}

/// Puts the CPU into a low-power wait, interruptible by any interrupt
/// (the timer tick, or a peripheral ISR raising an event).
#[inline]
pub fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}

/// Idles from `from` for up to `horizon` ms, waking early if `events_pending`
/// reports any event bit set. Emits idle/wake traces. Mirrors `Time::idle`,
/// including its "already passed" early return and its continuous
/// re-check of the elapsed time against the horizon.
pub fn idle(
    clock: &Clock,
    from: i64,
    horizon: i64,
    events_pending: impl Fn() -> bool,
    sink: &dyn TraceSink,
) {
    let now = clock.now();
    let remaining = horizon - (now - from);
    if remaining < 1 {
        return;
    }

    sink.on_trace(&Trace::MarkIdle { time: now });

    while clock.now() - now < remaining && !events_pending() {
        wait_for_interrupt();
    }

    sink.on_trace(&Trace::MarkWake { time: clock.now() });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;
    impl TraceSink for NullSink {
        fn on_error(&self, _trace: &Trace) -> bool {
            true
        }
    }

    #[test]
    fn tick_advances_now() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
        clock.tick();
        clock.tick();
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn idle_returns_immediately_when_horizon_already_elapsed() {
        let clock = Clock::new();
        for _ in 0..10 {
            clock.tick();
        }
        // from=0, horizon=5, but 10ms have already passed.
        idle(&clock, 0, 5, || false, &NullSink);
        assert_eq!(clock.now(), 10);
    }
}
