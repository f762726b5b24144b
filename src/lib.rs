//! # A cooperative real-time executive for single-core microcontrollers
//!
//! A non-preemptive scheduler: tasks run to completion on the same stack
//! as the main loop, never interrupted by one another. There is no
//! context switch, no per-task stack, and no priority inversion to reason
//! about — only three ordered lists and a fixed priority between them.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                   │
//! │   init() · event_init/dispatch() · task_init/dispatch()  │
//! │   dispatch() -> !  ·  halt() -> !  ·  debug_print!        │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Event Registry   │  Sync Primitives  │
//! │  scheduler.rs│   event.rs         │  sync.rs          │
//! │  ─ step()    │   ─ init()         │  ─ critical_section│
//! │  ─ run()     │   ─ dispatch()     │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │     Task Model (task.rs)    │   Static Heap (heap.rs)  │
//! │  Task · time_next · fits    │   Heap · Pool<T, N>       │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │                SysTick → millisecond clock               │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Every iteration of the main loop considers three lists, in strict
//! priority order:
//!
//! 1. **Periodic** tasks, ordered by next deadline.
//! 2. **Delayed** (one-shot) tasks, ordered by next deadline.
//! 3. **Event** tasks, walked in subscription order, run on the first
//!    match against the pending event register.
//!
//! If nothing is ready, the loop computes the soonest upcoming deadline
//! and puts the CPU into a `wfi` wait for that long (or until an event
//! arrives), via `time::idle`.
//!
//! ## Memory model
//!
//! - **No heap**: all state is statically allocated.
//! - **No `alloc`**: pure `core` only.
//! - **Fixed-size task pool**: `Pool<Task, MAX_TASKS>`, index-addressed by
//!   `ChunkId` rather than pointers.
//! - **Static byte heap**: `heap::Heap`, a bump allocator for
//!   application-owned task state, separate from the task pool.
//! - **Critical sections**: `cortex_m::interrupt::free()` guards every
//!   access to scheduler state shared with an ISR.
//!
//! ## Observability
//!
//! Every definition, start/stop, event, idle/wake, and error is reported
//! to a single installed `trace::TraceSink` — this crate's equivalent of
//! a logging facade, with two built-in sinks (`trace::PinSink`,
//! `trace::SerialSink`) and no further dependency.

#![no_std]

pub mod config;
pub mod error;
pub mod heap;
pub mod event;
pub mod task;
pub mod scheduler;
pub mod trace;
pub mod time;
pub mod arch;
pub mod kernel;
pub mod sync;
