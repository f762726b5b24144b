//! A periodic task whose body deliberately overruns its own period,
//! to exercise miss detection. The trace sink counts misses and keeps
//! resuming (`on_error` returns `true`); a stricter sink could instead
//! return `false` on the first miss to halt the executive.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use panic_halt as _;

use coop_rtos::kernel;
use coop_rtos::task::Task;
use coop_rtos::trace::{Trace, TraceSink};

static MISSED_COUNT: AtomicU32 = AtomicU32::new(0);

struct MissCountingSink;
impl TraceSink for MissCountingSink {
    fn on_error(&self, trace: &Trace) -> bool {
        if matches!(trace, Trace::ErrorMissed { .. }) {
            MISSED_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        true
    }
}
static SINK: MissCountingSink = MissCountingSink;

/// Spins long enough to blow past its own 10ms period every time.
fn slow_periodic(_task: &mut Task) -> bool {
    let mut work: u32 = 0;
    for _ in 0..1_000_000 {
        work = work.wrapping_add(1);
    }
    core::hint::black_box(work);
    true
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(&SINK);

    let task = kernel::task_init("slow_periodic", slow_periodic, |t| {
        t.period_ms = 10;
    })
    .expect("task_init failed");
    kernel::task_dispatch(task).expect("task_dispatch failed");

    kernel::dispatch(cp)
}
