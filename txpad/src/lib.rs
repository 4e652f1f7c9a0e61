//! Keypad input for a radio transmitter: matrix keys, a rotary encoder and toggle switches,
//! turned into debounced, auto-repeating key events.
//!
//! The pin-level parts live in `txpad_gpio`; this crate holds the timing side.

pub mod clock;
pub mod config;
pub mod driver;
pub mod irq;
pub mod keys;
pub mod sched;
pub mod sound;
