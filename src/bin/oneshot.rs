//! A delayed, one-shot task: runs exactly once, 2 seconds after startup,
//! then deallocates. Demonstrates the third outcome of a run (besides
//! reschedule and error): returning `false` to leave the task pool.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use coop_rtos::kernel;
use coop_rtos::task::Task;
use coop_rtos::trace::{Trace, TraceSink};

struct DemoSink;
impl TraceSink for DemoSink {
    fn on_error(&self, _trace: &Trace) -> bool {
        true
    }
}
static SINK: DemoSink = DemoSink;

/// Runs once, performs some startup calibration, then retires.
fn calibrate_sensor(_task: &mut Task) -> bool {
    false
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(&SINK);

    let task = kernel::task_init("calibrate_sensor", calibrate_sensor, |t| {
        t.delay_ms = 2000;
    })
    .expect("task_init failed");
    kernel::task_dispatch(task).expect("task_dispatch failed");

    kernel::dispatch(cp)
}
