//! Front panel toggle switches.

use std::fmt::{Debug, Formatter};
use crate::{GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioResult};

/// Number of toggle switches on the panel.
pub const SWITCH_COUNT: usize = 4;

/// Bitmask of toggle switches that are on.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct SwitchMask(u8);

impl SwitchMask {
    pub const SWA: SwitchMask = SwitchMask(1 << 0);
    pub const SWB: SwitchMask = SwitchMask(1 << 1);
    pub const SWC: SwitchMask = SwitchMask(1 << 2);
    pub const SWD: SwitchMask = SwitchMask(1 << 3);

    pub const fn empty() -> Self {
        SwitchMask(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        SwitchMask(bits & ((1 << SWITCH_COUNT) - 1))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: SwitchMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Debug for SwitchMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SwitchMask({:04b})", self.0)
    }
}

/// Reads the toggle switches straight from their pins, without any debouncing.
pub struct SwitchReader<'a> {
    pins: &'a dyn GpioBusInput<SWITCH_COUNT>,
}

impl Debug for SwitchReader<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SwitchReader({:?})", self.pins)
    }
}

impl<'a> SwitchReader<'a> {
    /// The switches close to ground, so they are pulled up and read active-low.
    pub fn configure(pins: &mut dyn GpioBus<SWITCH_COUNT>) -> GpioResult<()> {
        pins.set_bias(GpioBias::PullUp)?;
        pins.set_active_level(GpioActiveLevel::Low)
    }

    /// Creates a reader over the switch pins, ordered `SWA` to `SWD`.
    pub fn new(pins: &'a dyn GpioBusInput<SWITCH_COUNT>) -> Self {
        SwitchReader { pins }
    }

    pub fn read(&self) -> GpioResult<SwitchMask> {
        Ok(SwitchMask::from_bits(self.pins.read_bits()?))
    }

    /// Reads a single switch by its number.
    ///
    /// Switch `0` stands for "no switch assigned" and always reads as on. Numbers `1` to `4`
    /// are `SWA` to `SWD`; anything else reads as off.
    pub fn get(&self, id: u8) -> GpioResult<bool> {
        match id {
            0 => Ok(true),
            1..=4 => Ok(self.read()?.contains(SwitchMask::from_bits(1 << (id - 1)))),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioDriver;
    use crate::sim::SimGpioDriver;

    const PINS: [usize; SWITCH_COUNT] = [0, 1, 5, 13];

    #[test]
    fn switches_to_ground_read_as_on() {
        let driver = SimGpioDriver::new(16);
        let mut bus = driver.get_pin_bus(PINS).unwrap();
        SwitchReader::configure(&mut *bus).unwrap();
        let input = bus.as_input().unwrap();
        let switches = SwitchReader::new(&*input);

        assert_eq!(switches.read().unwrap(), SwitchMask::empty());

        driver.set_level(1, Some(false)).unwrap();
        driver.set_level(13, Some(false)).unwrap();
        let mask = switches.read().unwrap();
        assert!(mask.contains(SwitchMask::SWB));
        assert!(mask.contains(SwitchMask::SWD));
        assert!(!mask.contains(SwitchMask::SWA));
        assert_eq!(mask.bits(), 0b1010);

        assert!(switches.get(2).unwrap());
        assert!(!switches.get(3).unwrap());
        assert!(!switches.get(9).unwrap());
    }

    #[test]
    fn switch_zero_is_always_on() {
        let driver = SimGpioDriver::new(16);
        let mut bus = driver.get_pin_bus(PINS).unwrap();
        SwitchReader::configure(&mut *bus).unwrap();
        let input = bus.as_input().unwrap();
        let switches = SwitchReader::new(&*input);

        assert!(switches.get(0).unwrap());
        for pin in PINS {
            driver.set_level(pin, Some(false)).unwrap();
        }
        assert!(switches.get(0).unwrap());
    }
}
