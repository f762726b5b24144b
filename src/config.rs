//! # Configuration
//!
//! Compile-time constants governing the executive. All limits are fixed
//! at build time — there is no dynamic allocation anywhere in this crate.
//!
//! Mirrors `Conf.h`/`CheckConf.h` from the original implementation: values
//! are plain `const`s, and the `const _: () = assert!(...)` blocks below
//! take the place of the original's `#error` preprocessor checks.

/// Size in bytes of the static virtual heap (`heap::static_alloc`'s
/// backing buffer). Valid range: `0..=4096`.
pub const VIRTUAL_HEAP: usize = 2048;

/// Maximum number of simultaneously live tasks. Bounds the task pool.
/// Valid range: `0..=64`.
pub const MAX_TASKS: usize = 32;

/// Maximum length of a single `debug_print!` message, including the
/// terminator.
pub const MESSAGE_BUFFER: usize = 256;

/// Scheduler tick frequency in Hz. The executive is specified around an
/// implicit 1 kHz millisecond clock; this is not a tunable in the spec's
/// data model (`now()` returns milliseconds), so it is fixed rather than
/// exposed as a knob like the other constants.
pub const TICK_HZ: u32 = 1000;

/// Default core clock used to derive the SysTick reload value for a
/// 1 kHz tick. Override by calling `arch::cortex_m4::configure_systick`
/// with a different reload if your board runs at another frequency.
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

const _: () = assert!(VIRTUAL_HEAP <= 4096, "VIRTUAL_HEAP must be between 0 and 4096");
const _: () = assert!(MAX_TASKS <= 64, "MAX_TASKS must be between 0 and 64");
const _: () = assert!(MESSAGE_BUFFER > 0, "MESSAGE_BUFFER must be greater than 0");

#[cfg(not(any(
    feature = "events8",
    feature = "events16",
    feature = "events32",
    feature = "events64"
)))]
compile_error!("select exactly one event width feature: events8, events16, events32, or events64");

#[cfg(any(
    all(feature = "events8", feature = "events16"),
    all(feature = "events8", feature = "events32"),
    all(feature = "events8", feature = "events64"),
    all(feature = "events16", feature = "events32"),
    all(feature = "events16", feature = "events64"),
    all(feature = "events32", feature = "events64"),
))]
compile_error!("only one event width feature may be enabled at a time");
