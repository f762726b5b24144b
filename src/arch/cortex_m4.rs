//! # Cortex-M4 port layer
//!
//! Hardware-specific code for the ARM Cortex-M4. Unlike a preemptive
//! kernel, this executive never switches stacks or contexts — tasks run
//! to completion on the same call stack as `kernel::dispatch`'s loop, so
//! this port layer only has to configure the millisecond tick. There is
//! no PendSV handler here: nothing here defers work past the current
//! task's return, by design (see spec's "no preemption" non-goal).
//!
//! ## SysTick
//!
//! SysTick is configured to fire at `config::TICK_HZ` (1 kHz) using the
//! core clock as its source. Each tick advances the shared millisecond
//! clock; scheduling decisions are all made later, from
//! `kernel::dispatch`'s main-context loop.

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::kernel;

/// Configures SysTick to fire at `TICK_HZ`. Must be called once, before
/// `kernel::dispatch`, with interrupts still disabled.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// SysTick exception handler. Advances the millisecond clock; does
/// nothing else. All scheduling happens in `kernel::dispatch`'s loop,
/// which re-evaluates deadlines every time `Time::idle` wakes (including
/// on every tick).
#[no_mangle]
pub extern "C" fn SysTick() {
    kernel::on_tick();
}
