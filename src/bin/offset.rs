//! Two periodic tasks sharing the same period but phased apart by
//! `delay_ms`, so they never contend for the same tick. Demonstrates
//! that a task's first deadline is `delay_ms` from system start, with
//! `period_ms` taking over after that.

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

fn sample_sensor(_task: &mut Task) -> bool {
    true
}

fn log_status(_task: &mut Task) -> bool {
    true
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(&SINK);

    let sensor = kernel::task_init("sample_sensor", sample_sensor, |t| {
        t.period_ms = 100;
    })
    .expect("task_init failed");
    kernel::task_dispatch(sensor).expect("task_dispatch failed");

    // Same 100ms period, offset by half a period so it never lands on
    // the same tick as `sample_sensor`.
    let status = kernel::task_init("log_status", log_status, |t| {
        t.period_ms = 100;
        t.delay_ms = 50;
    })
    .expect("task_init failed");
    kernel::task_dispatch(status).expect("task_dispatch failed");

    kernel::dispatch(cp)
}
