//! # Task record and pool-backed list helpers
//!
//! A task is a record plus a handful of free functions operating on task
//! chunks held in a `Pool<Task, MAX_TASKS>` (see `scheduler.rs`) — the
//! direct analogue of `Task_t` and the free functions in `Task.cpp`.
//! Ordering, tie-breaking, and the `fits` leniency are ported verbatim.

use crate::event::EventMask;
use crate::heap::{ChunkId, Pool};

/// A task function. Returns `true` to stay scheduled, `false` to be
/// deallocated. Takes `&mut Task` — not `&Task` — because task bodies are
/// expected to reconfigure their own `period_ms`/`delay_ms`/`events`
/// fields mid-run (see the worked examples in the original `Task.h`);
/// a C `Task_t *self` already permitted this mutation, so `&mut` is the
/// faithful Rust rendering, not a behavior change.
pub type TaskFn = fn(&mut Task) -> bool;

/// Task Control Block. Stored inline inside `Pool<Task, MAX_TASKS>`; the
/// pool's `next` slot (not a field here) threads it onto whichever of the
/// three scheduler lists currently owns it.
#[derive(Clone, Copy)]
pub struct Task {
    pub fn_ptr: TaskFn,
    /// Opaque, caller-owned state. Never read by the scheduler.
    pub state: Option<core::ptr::NonNull<()>>,
    /// Events this task subscribes to; 0 for non-event tasks.
    pub events: EventMask,
    /// >0 = periodic, in milliseconds.
    pub period_ms: i16,
    /// Delay in ms until next run; reset to 0 after the first dispatch.
    pub delay_ms: i16,
    /// True until the task has run at least once.
    pub first: bool,
    /// Small identity used for tracing; the high bit doubles as the
    /// pin-mapped flag set by `kernel::trace_configure_pin`.
    pub instance: u8,
    /// Time (ms) this task last started, for deadline math.
    pub last: i64,
    /// Largest observed runtime in ms; used by `fits`.
    pub maximum: i16,
}

impl Task {
    pub fn new(fn_ptr: TaskFn, instance: u8) -> Self {
        Self {
            fn_ptr,
            state: None,
            events: 0,
            period_ms: 0,
            delay_ms: 0,
            first: true,
            instance,
            last: 0,
            maximum: 0,
        }
    }
}

/// The next time this task is expected to run.
///
/// - event tasks are "due as of their event": `now()`.
/// - on a task's first run, the deadline is `delay_ms` measured from
///   system zero, not `now() + delay_ms` — kept exactly as the original
///   does it; see DESIGN.md for why this quirk is preserved.
/// - otherwise `last + period_ms + delay_ms`.
pub fn time_next(task: &Task, now: i64) -> i64 {
    if task.events != 0 {
        return now;
    }
    if task.first {
        return task.delay_ms as i64;
    }
    task.last + task.period_ms as i64 + task.delay_ms as i64
}

pub fn time_remaining(task: &Task, now: i64, at: i64) -> i64 {
    time_next(task, now) - at
}

/// A fresh task (`maximum == 0`) always fits — a deliberate leniency;
/// miss detection catches violations that this lets through.
pub fn fits(task: &Task, horizon: i64) -> bool {
    (task.maximum as i64) < horizon
}

/// Inserts `task` into `list` (ordered by ascending `time_next`), FIFO
/// among ties. Returns the new head.
pub fn insert_ordered(
    pool: &mut Pool<Task, { crate::config::MAX_TASKS }>,
    list: Option<ChunkId>,
    task: ChunkId,
    now: i64,
) -> Option<ChunkId> {
    let task_time = time_next(pool.get(task), now);

    match list {
        None => {
            pool.cons(task, None);
            Some(task)
        }
        Some(head) if time_next(pool.get(head), now) > task_time => {
            pool.cons(task, Some(head));
            Some(task)
        }
        Some(head) => {
            let mut current = head;
            loop {
                match pool.next_of(current) {
                    Some(next) if time_next(pool.get(next), now) <= task_time => {
                        current = next;
                    }
                    next => {
                        pool.cons(current, Some(task));
                        pool.cons(task, next);
                        break;
                    }
                }
            }
            Some(head)
        }
    }
}

/// Appends `task` after `tail`. Returns the new tail; the caller updates
/// the list head on first insertion.
pub fn insert_tail(
    pool: &mut Pool<Task, { crate::config::MAX_TASKS }>,
    tail: Option<ChunkId>,
    task: ChunkId,
) -> ChunkId {
    pool.cons(task, None);
    if let Some(tail) = tail {
        pool.cons(tail, Some(task));
    }
    task
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Task) -> bool {
        true
    }

    #[test]
    fn time_next_uses_delay_on_first_run_from_zero() {
        let mut t = Task::new(noop, 0);
        t.delay_ms = 50;
        assert_eq!(time_next(&t, 1000), 50);
    }

    #[test]
    fn time_next_uses_last_period_delay_after_first_run() {
        let mut t = Task::new(noop, 0);
        t.first = false;
        t.last = 100;
        t.period_ms = 20;
        t.delay_ms = 5;
        assert_eq!(time_next(&t, 9999), 125);
    }

    #[test]
    fn event_task_is_due_now() {
        let mut t = Task::new(noop, 0);
        t.events = 1;
        assert_eq!(time_next(&t, 42), 42);
    }

    #[test]
    fn fresh_task_always_fits() {
        let t = Task::new(noop, 0);
        assert!(fits(&t, 0));
        assert!(fits(&t, 1));
    }

    #[test]
    fn insert_ordered_breaks_ties_fifo() {
        let mut pool: Pool<Task, 4> = Pool::new();
        let a = pool.alloc(Task::new(noop, 0)).unwrap();
        let b = pool.alloc(Task::new(noop, 1)).unwrap();
        pool.get_mut(a).delay_ms = 10;
        pool.get_mut(b).delay_ms = 10;

        let list = insert_ordered(&mut pool, None, a, 0);
        let list = insert_ordered(&mut pool, list, b, 0);

        assert_eq!(list, Some(a));
        assert_eq!(pool.next_of(a), Some(b));
    }

    #[test]
    fn insert_ordered_orders_by_deadline() {
        let mut pool: Pool<Task, 4> = Pool::new();
        let late = pool.alloc(Task::new(noop, 0)).unwrap();
        let early = pool.alloc(Task::new(noop, 1)).unwrap();
        pool.get_mut(late).delay_ms = 100;
        pool.get_mut(early).delay_ms = 10;

        let list = insert_ordered(&mut pool, None, late, 0);
        let list = insert_ordered(&mut pool, list, early, 0);

        assert_eq!(list, Some(early));
        assert_eq!(pool.next_of(early), Some(late));
    }

    #[test]
    fn insert_tail_chains_in_append_order() {
        let mut pool: Pool<Task, 4> = Pool::new();
        let a = pool.alloc(Task::new(noop, 0)).unwrap();
        let b = pool.alloc(Task::new(noop, 1)).unwrap();

        let tail = insert_tail(&mut pool, None, a);
        let tail = insert_tail(&mut pool, Some(tail), b);

        assert_eq!(tail, b);
        assert_eq!(pool.next_of(a), Some(b));
    }
}
