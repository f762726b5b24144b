//! # Kernel
//!
//! Top-level public API. Bundles the scheduler, clock, and trace sink into
//! a single global executive — the approach this kind of inherently-global
//! single-core state calls for — and exposes the free functions
//! applications call. Mirrors the original's file-static `Task_t`/`Event_t`
//! registers plus a raw-pointer escape hatch for the tick ISR, needed here
//! for the same reason: the SysTick handler must reach the clock without
//! holding a borrow across an exception boundary.
//!
//! ## Startup sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init(sink)         ← install the trace sink
//!         ├─► kernel::event_init/task_init/task_dispatch (×N)
//!         └─► kernel::dispatch(core_peripherals)   ← never returns
//! ```

use crate::arch::cortex_m4;
use crate::error::Error;
use crate::event::EventMask;
use crate::scheduler::{Scheduler, StepResult, TaskHandle};
use crate::sync;
use crate::task::{Task, TaskFn};
use crate::time::{self, Clock};
use crate::trace::{Trace, TraceSink};

struct Executive {
    scheduler: Scheduler,
    clock: Clock,
    sink: Option<&'static dyn TraceSink>,
}

impl Executive {
    const fn new() -> Self {
        Self { scheduler: Scheduler::new(), clock: Clock::new(), sink: None }
    }

    fn sink(&self) -> &dyn TraceSink {
        self.sink.expect("kernel::init must be called before any other kernel function")
    }
}

static mut EXECUTIVE: Executive = Executive::new();

/// Installs the trace sink and resets the scheduler and clock. Must be
/// called exactly once, from the main thread, before any other kernel
/// function. Emits the `Mark_Init` trace.
pub fn init(sink: &'static dyn TraceSink) {
    unsafe {
        EXECUTIVE = Executive::new();
        EXECUTIVE.sink = Some(sink);
    }
    let exec = executive();
    let now = exec.clock.now();
    exec.sink().on_trace(&Trace::MarkInit { time: now, heap: crate::config::VIRTUAL_HEAP });
}

// Safety: every access below goes through `sync::critical_section`, except
// the SysTick handler's `tick()` call, which only touches the clock's own
// `Cell` and is itself non-reentrant on a single core.
fn executive() -> &'static mut Executive {
    unsafe { &mut *&raw mut EXECUTIVE }
}

/// Called from the SysTick handler. Advances the clock only; all
/// scheduling decisions are made later, in `dispatch`'s loop.
pub fn on_tick() {
    executive().clock.tick();
}

/// Defines a new event, returning its bit mask.
pub fn event_init(handle: &'static str) -> Result<EventMask, Error> {
    sync::critical_section(|_cs| {
        let exec = executive();
        exec.scheduler.event_init(handle, exec.sink())
    })
}

/// Raises `mask`. Safe to call from an ISR — the whole body runs inside a
/// critical section.
pub fn event_dispatch(mask: EventMask) -> Result<(), Error> {
    sync::critical_section(|_cs| {
        let exec = executive();
        let now = exec.clock.now();
        exec.scheduler.event_dispatch(mask, now, exec.sink())
    })
}

/// Allocates a task, then lets the caller configure its fields through
/// `configure` before returning the handle. Splitting allocation from
/// configuration mirrors the original's `Task::init` followed by direct
/// field assignment, while confining the pool access to one critical
/// section; call `task_dispatch` once configuration is complete.
pub fn task_init(
    handle: &'static str,
    fn_ptr: TaskFn,
    configure: impl FnOnce(&mut Task),
) -> Result<TaskHandle, Error> {
    sync::critical_section(|_cs| {
        let exec = executive();
        let id = exec.scheduler.task_init(handle, fn_ptr, exec.sink())?;
        exec.scheduler.with_task(id, configure);
        Ok(id)
    })
}

/// Validates and enqueues a configured task.
pub fn task_dispatch(handle: TaskHandle) -> Result<(), Error> {
    sync::critical_section(|_cs| {
        let exec = executive();
        let now = exec.clock.now();
        exec.scheduler.task_dispatch(handle, now, exec.sink())
    })
}

/// Configures a GPIO pin for the built-in pin trace sink: sets the task's
/// `instance` field to `pin | 0x80`.
pub fn trace_configure_pin(handle: TaskHandle, pin: u8) {
    sync::critical_section(|_cs| {
        executive().scheduler.with_task(handle, |t| t.instance = pin | 0x80);
    });
}

/// Formats `args` into a fixed-capacity buffer and emits a debug trace —
/// the `no_std` equivalent of `vsnprintf` into a message buffer. Call
/// through the `debug_print!` macro rather than directly.
pub fn debug_print(args: core::fmt::Arguments) {
    use core::fmt::Write;

    struct FixedBuf {
        buf: [u8; crate::config::MESSAGE_BUFFER],
        len: usize,
    }
    impl Write for FixedBuf {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let remaining = self.buf.len() - self.len;
            let n = s.len().min(remaining);
            self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
            self.len += n;
            Ok(())
        }
    }

    let mut buf = FixedBuf { buf: [0u8; crate::config::MESSAGE_BUFFER], len: 0 };
    let _ = write!(buf, "{}", args);

    sync::critical_section(|_cs| {
        let exec = executive();
        let message = core::str::from_utf8(&buf.buf[..buf.len]).unwrap_or("<invalid utf8>");
        // Safety: the sink consumes this trace synchronously, inside this
        // critical section, before `message` (borrowed from the stack-local
        // `buf`) goes out of scope. `Trace::DebugMessage` is declared
        // `&'static str` only to match every other trace's handle payload.
        let message: &'static str = unsafe { core::mem::transmute::<&str, &'static str>(message) };
        exec.sink().on_trace(&Trace::DebugMessage { message });
    });
}

/// Formats a message and emits a debug trace. See [`debug_print`].
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        $crate::kernel::debug_print(format_args!($($arg)*))
    };
}

/// Emits the halt trace and stops scheduling permanently.
pub fn halt() -> ! {
    sync::critical_section(|_cs| {
        let exec = executive();
        let now = exec.clock.now();
        exec.sink().on_trace(&Trace::MarkHalt { time: now });
    });
    loop {
        cortex_m::asm::bkpt();
    }
}

/// Wraps the installed sink so a `false` return from `on_error` halts
/// immediately, matching the original's `if (!UDF::error(...)) halt()`
/// behavior without threading a bool back through every caller.
struct HaltingSink<'a>(&'a dyn TraceSink);

impl<'a> TraceSink for HaltingSink<'a> {
    fn on_trace(&self, trace: &Trace) {
        self.0.on_trace(trace)
    }

    fn on_error(&self, trace: &Trace) -> bool {
        let resume = self.0.on_error(trace);
        if !resume {
            halt();
        }
        resume
    }
}

/// Enters the scheduling loop. Never returns.
///
/// Configures SysTick, then runs the priority state machine (periodic >
/// delayed > event > idle) forever.
pub fn dispatch(mut core_peripherals: cortex_m::Peripherals) -> ! {
    cortex_m4::configure_systick(&mut core_peripherals.SYST);

    loop {
        let exec = executive();
        let now = exec.clock.now();
        let halting = HaltingSink(exec.sink());

        let outcome = sync::critical_section(|_cs| exec.scheduler.step(now, &halting));
        match outcome {
            StepResult::Ran => continue,
            StepResult::Idle { horizon } => {
                let exec = executive();
                let now = exec.clock.now();
                time::idle(&exec.clock, now, horizon, || exec.scheduler.pending_events() != 0, &halting);
            }
        }
    }
}
