//! An event-driven task woken by a simulated button-press interrupt.
//! Demonstrates `event_init`/`event_dispatch` and a task subscribed via
//! `events` rather than `period_ms`/`delay_ms`.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use coop_rtos::event::EventMask;
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

static mut BUTTON_EVENT: EventMask = 0;

fn handle_button_press(_task: &mut Task) -> bool {
    true
}

/// Placeholder for a real GPIO EXTI handler. A board support crate would
/// register this against the pin's interrupt vector; here it is called
/// directly from `main` to simulate one press.
#[allow(static_mut_refs)]
fn on_button_interrupt() {
    let mask = unsafe { BUTTON_EVENT };
    kernel::event_dispatch(mask).expect("event_dispatch failed");
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(&SINK);

    let mask = kernel::event_init("button_press").expect("event_init failed");
    unsafe {
        BUTTON_EVENT = mask;
    }

    let button_task = kernel::task_init("handle_button_press", handle_button_press, |t| {
        t.events = mask;
    })
    .expect("task_init failed");
    kernel::task_dispatch(button_task).expect("task_dispatch failed");

    // Simulates a single press; a real ISR would call this instead.
    on_button_interrupt();

    kernel::dispatch(cp)
}
