//! A single periodic task that blinks an LED forever. The `no_std`
//! equivalent of `blink.cpp`: one task, one 500ms period, no events.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use coop_rtos::kernel;
use coop_rtos::task::Task;
use coop_rtos::trace::PinSink;

/// Stands in for `digitalWrite(LED_BUILTIN, ...)`. A real board would
/// write a GPIO ODR bit here instead. The pin toggle is driven by
/// `PinSink` off the task's start/stop trace, rather than from the task
/// body, so the body itself needs no hardware access at all.
fn set_led(_pin: u8, _level: bool) {}
static SINK: PinSink<fn(u8, bool)> = PinSink::new(set_led);

fn task_led(_task: &mut Task) -> bool {
    true
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(&SINK);

    let task_led = kernel::task_init("task_led", task_led, |t| {
        t.period_ms = 500;
    })
    .expect("task_init failed");
    kernel::trace_configure_pin(task_led, 13);
    kernel::task_dispatch(task_led).expect("task_dispatch failed");

    kernel::dispatch(cp)
}
