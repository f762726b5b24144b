//! # Trace emitter
//!
//! Every component hands tagged records to a process-wide sink rather
//! than logging directly — this is this crate's whole "ambient logging"
//! story, so there is no additional `log`/`defmt` dependency. `Trace` is
//! a Rust enum (one variant per tag from the original's `Trace_Tag_t`)
//! instead of a tagged union; `TraceSink` is installed once as a
//! `&'static dyn TraceSink`, the same no-`alloc` global-singleton idiom
//! the `log` crate uses for `set_logger`.

use crate::event::EventMask;

/// One instance of every record kind the executive can emit. Carries
/// exactly the payload the matching original tag carried.
#[derive(Debug, Clone, Copy)]
pub enum Trace {
    // Definitions
    DefTask { handle: &'static str, instance: u8 },
    DefEvent { handle: &'static str, mask: EventMask },
    DefAlloc { handle: &'static str, bytes: usize },
    // Marks
    MarkInit { time: i64, heap: usize },
    MarkHalt { time: i64 },
    MarkStart { time: i64, instance: u8 },
    MarkStop { time: i64, instance: u8 },
    MarkEvent { time: i64, mask: EventMask },
    MarkIdle { time: i64 },
    MarkWake { time: i64 },
    // Errors
    ErrorMaxEvent,
    ErrorUndefinedEvent { mask: EventMask },
    ErrorMaxAlloc,
    ErrorMaxPool,
    ErrorNullPool,
    ErrorMaxTask,
    ErrorNullTask,
    ErrorInvalidTask { instance: u8 },
    ErrorDuplicateEvent { mask: EventMask },
    ErrorMissed { instance: u8 },
    // Debug
    DebugMessage { message: &'static str },
}

impl Trace {
    /// True for the tags the original gates behind `RTOS_TRACE` (everything
    /// but errors, which are always emitted).
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Trace::ErrorMaxEvent
                | Trace::ErrorUndefinedEvent { .. }
                | Trace::ErrorMaxAlloc
                | Trace::ErrorMaxPool
                | Trace::ErrorNullPool
                | Trace::ErrorMaxTask
                | Trace::ErrorNullTask
                | Trace::ErrorInvalidTask { .. }
                | Trace::ErrorDuplicateEvent { .. }
                | Trace::ErrorMissed { .. }
        )
    }
}

/// Receives every trace this crate emits. `on_trace` only fires while the
/// `trace` feature is enabled; `on_error` always fires for error traces
/// and its return value decides continue (`true`) vs halt (`false`).
pub trait TraceSink: Sync {
    #[cfg_attr(not(feature = "trace"), allow(unused_variables))]
    fn on_trace(&self, trace: &Trace) {
        #[cfg(feature = "trace")]
        {
            let _ = trace;
        }
    }

    /// Returns `true` to resume scheduling, `false` to halt.
    fn on_error(&self, trace: &Trace) -> bool;
}

/// Toggles a GPIO pin on `MarkStart`/`MarkStop` for any task whose
/// `instance` has the pin-mapped high bit set (see
/// `kernel::trace_configure_pin`). `write` takes `(pin, level)`.
pub struct PinSink<F: Fn(u8, bool) + Sync> {
    write: F,
}

const PIN_BIT: u8 = 0x80;

impl<F: Fn(u8, bool) + Sync> PinSink<F> {
    pub const fn new(write: F) -> Self {
        Self { write }
    }
}

impl<F: Fn(u8, bool) + Sync> TraceSink for PinSink<F> {
    fn on_trace(&self, trace: &Trace) {
        match *trace {
            Trace::MarkStart { instance, .. } if instance & PIN_BIT != 0 => {
                (self.write)(instance & !PIN_BIT, true);
            }
            Trace::MarkStop { instance, .. } if instance & PIN_BIT != 0 => {
                (self.write)(instance & !PIN_BIT, false);
            }
            _ => {}
        }
    }

    fn on_error(&self, _trace: &Trace) -> bool {
        true
    }
}

/// A single-byte output, implemented by whatever UART/USB-CDC driver the
/// application uses. Kept minimal so this crate never depends on a
/// specific HAL trait.
pub trait ByteSink {
    fn write_byte(&self, byte: u8);
}

/// Emits every trace as a raw byte stream, matching `Trace::serial_trace`:
/// on first use, one byte giving `size_of::<EventMask>()`, then for every
/// trace a fixed binary encoding, followed by a NUL-terminated handle
/// string for definition traces and debug messages only.
pub struct SerialSink<W: ByteSink + Sync> {
    writer: W,
    first: core::cell::Cell<bool>,
}

// Safety: `first` is only mutated from within a critical section (every
// call into `on_trace`/`on_error` happens under `sync::critical_section`).
unsafe impl<W: ByteSink + Sync> Sync for SerialSink<W> {}

impl<W: ByteSink + Sync> SerialSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer, first: core::cell::Cell::new(true) }
    }

    fn write_str_nul(&self, s: &str) {
        for b in s.bytes() {
            self.writer.write_byte(b);
        }
        self.writer.write_byte(0);
    }

    fn encode(&self, trace: &Trace) {
        if self.first.get() {
            self.writer.write_byte(core::mem::size_of::<EventMask>() as u8);
            self.first.set(false);
        }

        let tag = trace_tag(trace);
        self.writer.write_byte(tag);

        match *trace {
            Trace::DefTask { instance, .. } => self.writer.write_byte(instance),
            Trace::DefEvent { mask, .. } => write_event_mask(&self.writer, mask),
            Trace::DefAlloc { bytes, .. } => {
                for b in (bytes as u32).to_le_bytes() {
                    self.writer.write_byte(b);
                }
            }
            Trace::MarkInit { time, heap } => {
                write_i64(&self.writer, time);
                for b in (heap as u32).to_le_bytes() {
                    self.writer.write_byte(b);
                }
            }
            Trace::MarkHalt { time } => write_i64(&self.writer, time),
            Trace::MarkStart { time, instance } | Trace::MarkStop { time, instance } => {
                write_i64(&self.writer, time);
                self.writer.write_byte(instance);
            }
            Trace::MarkEvent { time, mask } => {
                write_i64(&self.writer, time);
                write_event_mask(&self.writer, mask);
            }
            Trace::MarkIdle { time } | Trace::MarkWake { time } => write_i64(&self.writer, time),
            Trace::ErrorUndefinedEvent { mask } | Trace::ErrorDuplicateEvent { mask } => {
                write_event_mask(&self.writer, mask)
            }
            Trace::ErrorInvalidTask { instance } | Trace::ErrorMissed { instance } => {
                self.writer.write_byte(instance)
            }
            Trace::ErrorMaxEvent
            | Trace::ErrorMaxAlloc
            | Trace::ErrorMaxPool
            | Trace::ErrorNullPool
            | Trace::ErrorMaxTask
            | Trace::ErrorNullTask => {}
            Trace::DebugMessage { .. } => {}
        }

        match *trace {
            Trace::DefTask { handle, .. } | Trace::DefEvent { handle, .. } | Trace::DefAlloc { handle, .. } => {
                self.write_str_nul(handle)
            }
            Trace::DebugMessage { message } => self.write_str_nul(message),
            _ => {}
        }
    }
}

fn write_i64(w: &dyn ByteSink, v: i64) {
    for b in v.to_le_bytes() {
        w.write_byte(b);
    }
}

fn write_event_mask(w: &dyn ByteSink, mask: EventMask) {
    for b in mask.to_le_bytes() {
        w.write_byte(b);
    }
}

fn trace_tag(trace: &Trace) -> u8 {
    match trace {
        Trace::DefTask { .. } => 0,
        Trace::DefEvent { .. } => 1,
        Trace::DefAlloc { .. } => 2,
        Trace::MarkInit { .. } => 3,
        Trace::MarkHalt { .. } => 4,
        Trace::MarkStart { .. } => 5,
        Trace::MarkStop { .. } => 6,
        Trace::MarkEvent { .. } => 7,
        Trace::MarkIdle { .. } => 8,
        Trace::MarkWake { .. } => 9,
        Trace::ErrorMaxEvent => 10,
        Trace::ErrorUndefinedEvent { .. } => 11,
        Trace::ErrorMaxAlloc => 12,
        Trace::ErrorMaxPool => 13,
        Trace::ErrorNullPool => 14,
        Trace::ErrorMaxTask => 15,
        Trace::ErrorNullTask => 16,
        Trace::ErrorInvalidTask { .. } => 17,
        Trace::ErrorDuplicateEvent { .. } => 18,
        Trace::ErrorMissed { .. } => 19,
        Trace::DebugMessage { .. } => 20,
    }
}

impl<W: ByteSink + Sync> TraceSink for SerialSink<W> {
    fn on_trace(&self, trace: &Trace) {
        self.encode(trace);
    }

    fn on_error(&self, trace: &Trace) -> bool {
        self.encode(trace);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    struct RecordingSink {
        bytes: RefCell<[u8; 64]>,
        len: RefCell<usize>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { bytes: RefCell::new([0; 64]), len: RefCell::new(0) }
        }
    }

    impl ByteSink for RecordingSink {
        fn write_byte(&self, byte: u8) {
            let mut len = self.len.borrow_mut();
            self.bytes.borrow_mut()[*len] = byte;
            *len += 1;
        }
    }

    #[test]
    fn serial_sink_emits_width_byte_once() {
        let sink = SerialSink::new(RecordingSink::new());
        sink.on_trace(&Trace::MarkHalt { time: 1 });
        sink.on_trace(&Trace::MarkHalt { time: 2 });
        // first byte is the width marker; it is not repeated on the
        // second trace even though the wire encoding otherwise starts
        // fresh with a tag byte each time.
        assert_eq!(sink.writer.bytes.borrow()[0], core::mem::size_of::<EventMask>() as u8);
        assert_eq!(*sink.writer.len.borrow(), 1 + 2 * (1 + 8));
    }

    #[test]
    fn pin_sink_ignores_unmapped_instance() {
        let toggled = RefCell::new(None);
        let sink = PinSink::new(|pin, level| *toggled.borrow_mut() = Some((pin, level)));
        sink.on_trace(&Trace::MarkStart { time: 0, instance: 3 });
        assert!(toggled.borrow().is_none());
        sink.on_trace(&Trace::MarkStart { time: 0, instance: 3 | PIN_BIT });
        assert_eq!(*toggled.borrow(), Some((3, true)));
    }
}
