//! Electrical-signal layer of the txpad front panel.
//!
//! Pins and pin buses are handed out by a [GpioDriver] and converted into inputs or outputs.
//! On top of that sit the panel peripherals: the key matrix ([keypad]), the rotary encoder
//! ([rotenc]), the toggle switches ([switches]) and the beeper PWM channel ([pwm]).

pub mod keypad;
pub mod pwm;
pub mod rotenc;
pub mod sim;
pub mod switches;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("error: {0}")]
    Other(String),
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Gets the GPIO pin bus at the specific indices.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the active level of the GPIO pin.
///
/// By default, the active level is high. The keypad lines and the switches are wired
/// active-low, so the drivers configure them with [GpioActiveLevel::Low] and work with
/// logical values from then on.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Converts between a logical value and the physical level on the pin.
    ///
    /// The conversion is its own inverse.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

/// Specifies the bias of the GPIO pin.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// Specifies the drive mode of the GPIO pin.
///
/// Works only in output mode. The matrix columns use [GpioDriveMode::OpenDrain] so that an
/// unselected column floats instead of fighting the selected one through a pressed key.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioDriveMode {
    /// GPIO pin is driven high or low with low impedance.
    #[default] PushPull,
    /// GPIO pin is driven low or left floating when high.
    OpenDrain,
    /// GPIO pin is driven high or left floating when low.
    OpenSource,
}

impl GpioDriveMode {
    /// Gets the real state that will be outputted on the GPIO pin based on the drive mode and the
    /// physical level requested.
    ///
    /// # Returns
    /// - `Some(true)` if the pin will be driven high.
    /// - `Some(false)` if the pin will be driven low.
    /// - `None` if the pin will be left floating.
    pub fn get_state(&self, level: bool) -> Option<bool> {
        match self {
            GpioDriveMode::PushPull => Some(level),
            GpioDriveMode::OpenDrain => if level { None } else { Some(false) },
            GpioDriveMode::OpenSource => if level { Some(true) } else { None },
        }
    }
}

pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to input, allowing reading its state.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>>;
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Sets the active level of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support active level.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Sets the bias of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Sets the drive mode of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support drive mode.
    fn set_drive_mode(&mut self, _mode: GpioDriveMode) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioInput: Debug {
    /// Reads the logical state of the GPIO pin.
    fn read(&self) -> GpioResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Writes the logical state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBus<const N: usize>: Debug {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    fn set_drive_mode(&mut self, _mode: GpioDriveMode) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    fn read(&self) -> GpioResult<[bool; N]>;
}

impl<const N: usize> dyn GpioBusInput<N> + '_ {
    /// Reads the values of the GPIO pins in the bus.
    /// Returns them packed into a byte, LSb first.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the bus is wider than 8 pins.
    pub fn read_bits(&self) -> GpioResult<u8> {
        if N > 8 {
            return Err(GpioError::InvalidArgument);
        }

        let values = self.read()?;
        Ok(values
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value)
            .fold(0u8, |bits, (i, _)| bits | 1 << i))
    }
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl<const N: usize> dyn GpioBusOutput<N> + '_ {
    /// Writes the values to the GPIO pins in the bus.
    /// The values are taken from a byte, LSb first.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the value does not fit in the bus.
    pub fn write_bits(&self, value: u8) -> GpioResult<()> {
        if N > 8 || (N < 8 && value >> N != 0) {
            return Err(GpioError::InvalidArgument);
        }

        let mut values = [false; N];
        for (i, slot) in values.iter_mut().enumerate() {
            *slot = value & (1 << i) != 0;
        }
        self.write(&values)
    }
}
