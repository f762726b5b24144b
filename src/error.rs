//! # Error taxonomy
//!
//! Every variant here has a matching `Trace::Error*` record (see
//! `trace.rs`) — detecting one of these and reporting it to the trace
//! sink are the same act. There is no local recovery: the caller's
//! `TraceSink::on_error` return value is what decides continue vs halt.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `event_init` called after all `MAX_EVENTS` bits are taken.
    MaxEvent,
    /// `static_alloc` would exceed `VIRTUAL_HEAP`.
    MaxAlloc,
    /// A pool's free list is empty.
    MaxPool,
    /// The task pool is full.
    MaxTask,
    /// `event_dispatch` called with a bit outside the defined set.
    UndefinedEvent,
    /// Two tasks subscribe to overlapping event bits.
    DuplicateEvent,
    /// A task mixes `events` with a nonzero `period_ms`/`delay_ms`, or
    /// has a null function pointer.
    InvalidTask,
    /// A task handle was expected but absent.
    NullTask,
    /// A periodic or delayed task started after its scheduled deadline.
    Missed,
}
