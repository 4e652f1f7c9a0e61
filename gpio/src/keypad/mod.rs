mod gpio;
mod key;

use std::fmt::Debug;
use crate::GpioResult;
pub use gpio::*;
pub use key::*;

/// The `Keypad` trait defines the interface for keypad input devices.
///
/// Only one pressed key is ever reported; when several are held, the implementation decides
/// which one wins.
pub trait Keypad: Debug {
    /// Scans the keypad once, returning the pressed key, if any.
    ///
    /// The result is raw: bounce filtering and repeat handling are up to the caller.
    fn scan(&self) -> GpioResult<Option<KeyCode>>;
}

impl<K: Keypad + ?Sized> Keypad for &K {
    fn scan(&self) -> GpioResult<Option<KeyCode>> {
        (**self).scan()
    }
}
