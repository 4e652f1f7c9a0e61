//! Simulated GPIO backend.
//!
//! Models just enough electrical behaviour to exercise the panel drivers on a host: per-pin
//! bias, push-pull/open-drain outputs, externally forced levels (switches, encoder phases) and
//! closed key contacts joining two lines.

use crate::pwm::{PwmPin, PwmPolarity};
use crate::{GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

#[derive(Copy, Clone, Debug, Default)]
struct SimLine {
    /// Level driven by our own output, `None` when floating or in input mode.
    output: Option<bool>,
    /// Level forced from outside, e.g. by a toggle switch to ground.
    forced: Option<bool>,
    bias: GpioBias,
}

impl SimLine {
    fn source(&self) -> Option<bool> {
        self.output.or(self.forced)
    }
}

pub struct SimGpioDriver {
    lines: RefCell<Vec<SimLine>>,
    contacts: RefCell<Vec<(usize, usize)>>,
    used_pins: BitVec<AtomicU8>,
}

impl SimGpioDriver {
    pub fn new(count: usize) -> Self {
        SimGpioDriver {
            lines: RefCell::new(vec![SimLine::default(); count]),
            contacts: RefCell::new(Vec::new()),
            used_pins: BitVec::repeat(false, count),
        }
    }

    fn check_index(&self, index: usize) -> GpioResult<()> {
        if index >= self.lines.borrow().len() {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    /// Closes a contact between two lines, like a pressed key joining a column and a row.
    pub fn close_contact(&self, a: usize, b: usize) {
        let mut contacts = self.contacts.borrow_mut();
        if !contacts.iter().any(|&c| c == (a, b) || c == (b, a)) {
            trace!("Sim contact {}-{} closed", a, b);
            contacts.push((a, b));
        }
    }

    /// Opens a previously closed contact.
    pub fn open_contact(&self, a: usize, b: usize) {
        self.contacts.borrow_mut().retain(|&c| c != (a, b) && c != (b, a));
        trace!("Sim contact {}-{} opened", a, b);
    }

    /// Forces the physical level of a line from outside, or releases it with `None`.
    pub fn set_level(&self, index: usize, level: Option<bool>) -> GpioResult<()> {
        self.check_index(index)?;
        self.lines.borrow_mut()[index].forced = level;
        Ok(())
    }

    /// Gets the level our own output drives on a line, `None` if it is not driven.
    pub fn output(&self, index: usize) -> Option<bool> {
        self.lines.borrow().get(index).and_then(|line| line.output)
    }

    /// Resolves the physical level of a line.
    ///
    /// A driven or forced line keeps its own level. Otherwise any contact peer driven low wins
    /// (wired-AND), then a peer driven high, and finally the line's bias decides.
    pub fn level(&self, index: usize) -> GpioResult<bool> {
        self.check_index(index)?;
        let lines = self.lines.borrow();
        let line = lines[index];
        if let Some(level) = line.source() {
            return Ok(level);
        }

        let contacts = self.contacts.borrow();
        let peers = contacts.iter().filter_map(|&(a, b)| {
            if a == index {
                Some(b)
            } else if b == index {
                Some(a)
            } else {
                None
            }
        });

        let mut pulled_high = false;
        for peer in peers {
            match lines.get(peer).and_then(SimLine::source) {
                Some(false) => return Ok(false),
                Some(true) => pulled_high = true,
                None => {}
            }
        }

        Ok(pulled_high || line.bias == GpioBias::PullUp)
    }

    fn drive(&self, index: usize, level: Option<bool>) {
        if let Some(line) = self.lines.borrow_mut().get_mut(index) {
            line.output = level;
        }
    }

    fn set_bias(&self, index: usize, bias: GpioBias) {
        if let Some(line) = self.lines.borrow_mut().get_mut(index) {
            line.bias = bias;
        }
    }

    fn write_logical(&self, index: usize, value: bool, active_level: GpioActiveLevel, drive_mode: GpioDriveMode) {
        let level = active_level.get_state(value);
        self.drive(index, drive_mode.get_state(level));
    }

    fn read_logical(&self, index: usize, active_level: GpioActiveLevel) -> GpioResult<bool> {
        Ok(active_level.get_state(self.level(index)?))
    }

    fn release(&self, index: usize) {
        self.drive(index, None);
        self.used_pins.set_aliased(index, false);
    }
}

impl Debug for SimGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimGpioDriver({})", self.lines.borrow().len())
    }
}

impl GpioDriver for SimGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.lines.borrow().len())
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.check_index(index)?;

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(SimPin {
            driver: self,
            pin_index: index,
            active_level: GpioActiveLevel::High,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        let n = self.count()?;

        if indices.iter().any(|&index| index >= n) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in &indices {
            self.used_pins.set_aliased(index, true);
        }

        Ok(Box::new(SimBus {
            driver: self,
            pin_indices: indices,
            active_level: GpioActiveLevel::High,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }
}

struct SimPin<'a> {
    driver: &'a SimGpioDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
    drive_mode: GpioDriveMode,
}

impl Debug for SimPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for SimPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.driver.drive(self.pin_index, None);
        Ok(Box::new(SimInput { pin: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.write_logical(self.pin_index, false, self.active_level, self.drive_mode);
        Ok(Box::new(SimOutput { pin: self }))
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.set_bias(self.pin_index, bias);
        Ok(())
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.drive_mode = mode;
        Ok(())
    }
}

impl Drop for SimPin<'_> {
    fn drop(&mut self) {
        self.driver.release(self.pin_index);
    }
}

struct SimInput<'a> {
    pin: &'a SimPin<'a>,
}

impl Debug for SimInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for SimInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        self.pin.driver.read_logical(self.pin.pin_index, self.pin.active_level)
    }
}

struct SimOutput<'a> {
    pin: &'a SimPin<'a>,
}

impl Debug for SimOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for SimOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        let pin = self.pin;
        pin.driver.write_logical(pin.pin_index, value, pin.active_level, pin.drive_mode);
        Ok(())
    }
}

struct SimBus<'a, const N: usize> {
    driver: &'a SimGpioDriver,
    pin_indices: [usize; N],
    active_level: GpioActiveLevel,
    drive_mode: GpioDriveMode,
}

impl<const N: usize> Debug for SimBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for SimBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        for &index in &self.pin_indices {
            self.driver.drive(index, None);
        }
        Ok(Box::new(SimBusInput { bus: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        for &index in &self.pin_indices {
            self.driver.write_logical(index, false, self.active_level, self.drive_mode);
        }
        Ok(Box::new(SimBusOutput { bus: self }))
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        for &index in &self.pin_indices {
            self.driver.set_bias(index, bias);
        }
        Ok(())
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.drive_mode = mode;
        Ok(())
    }
}

impl<const N: usize> Drop for SimBus<'_, N> {
    fn drop(&mut self) {
        for &index in &self.pin_indices {
            self.driver.release(index);
        }
    }
}

struct SimBusInput<'a, const N: usize> {
    bus: &'a SimBus<'a, N>,
}

impl<const N: usize> Debug for SimBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for SimBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let mut values = [false; N];
        for (value, &index) in values.iter_mut().zip(&self.bus.pin_indices) {
            *value = self.bus.driver.read_logical(index, self.bus.active_level)?;
        }
        Ok(values)
    }
}

struct SimBusOutput<'a, const N: usize> {
    bus: &'a SimBus<'a, N>,
}

impl<const N: usize> Debug for SimBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for SimBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        let bus = self.bus;
        for (&value, &index) in values.iter().zip(&bus.pin_indices) {
            bus.driver.write_logical(index, value, bus.active_level, bus.drive_mode);
        }
        Ok(())
    }
}

/// A PWM channel that only remembers what it was told.
#[derive(Debug, Default)]
pub struct SimPwmPin {
    period_ns: u32,
    duty_ns: u32,
    polarity: PwmPolarity,
    enabled: bool,
    /// Number of times the channel was enabled.
    pub starts: usize,
}

impl PwmPin for SimPwmPin {
    fn period_ns(&self) -> GpioResult<u32> {
        Ok(self.period_ns)
    }

    fn set_period_ns(&mut self, period_ns: u32) -> GpioResult<()> {
        if period_ns == 0 {
            return Err(GpioError::InvalidArgument);
        }
        self.period_ns = period_ns;
        Ok(())
    }

    fn duty_ns(&self) -> GpioResult<u32> {
        Ok(self.duty_ns)
    }

    fn set_duty_ns(&mut self, duty_ns: u32) -> GpioResult<()> {
        if duty_ns > self.period_ns {
            return Err(GpioError::InvalidArgument);
        }
        self.duty_ns = duty_ns;
        Ok(())
    }

    fn polarity(&self) -> GpioResult<PwmPolarity> {
        Ok(self.polarity)
    }

    fn set_polarity(&mut self, polarity: PwmPolarity) -> GpioResult<()> {
        self.polarity = polarity;
        Ok(())
    }

    fn is_enabled(&self) -> GpioResult<bool> {
        Ok(self.enabled)
    }

    fn enable(&mut self) -> GpioResult<()> {
        self.enabled = true;
        self.starts += 1;
        Ok(())
    }

    fn disable(&mut self) -> GpioResult<()> {
        self.enabled = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_cannot_be_taken_twice() {
        let driver = SimGpioDriver::new(4);
        let _pin = driver.get_pin(1).unwrap();
        assert_eq!(driver.get_pin(1).unwrap_err(), GpioError::AlreadyInUse);
        assert_eq!(driver.get_pin_bus([0, 1]).unwrap_err(), GpioError::AlreadyInUse);
        assert_eq!(driver.get_pin(9).unwrap_err(), GpioError::InvalidArgument);
    }

    #[test]
    fn dropping_a_pin_frees_it() {
        let driver = SimGpioDriver::new(4);
        drop(driver.get_pin(2).unwrap());
        assert!(driver.get_pin(2).is_ok());
    }

    #[test]
    fn pull_up_reads_high_until_forced_low() {
        let driver = SimGpioDriver::new(4);
        let mut pin = driver.get_pin(0).unwrap();
        pin.set_bias(GpioBias::PullUp).unwrap();
        pin.set_active_level(GpioActiveLevel::Low).unwrap();
        let input = pin.as_input().unwrap();
        assert!(!input.read().unwrap());

        driver.set_level(0, Some(false)).unwrap();
        assert!(input.read().unwrap());
    }

    #[test]
    fn open_drain_floats_when_released() {
        let driver = SimGpioDriver::new(4);
        let mut pin = driver.get_pin(3).unwrap();
        pin.set_drive_mode(GpioDriveMode::OpenDrain).unwrap();
        let output = pin.as_output().unwrap();
        assert_eq!(driver.output(3), Some(false));

        output.write(true).unwrap();
        assert_eq!(driver.output(3), None);
    }

    #[test]
    fn contact_carries_a_low_level() {
        let driver = SimGpioDriver::new(4);
        let mut bus = driver.get_pin_bus([0, 1]).unwrap();
        bus.set_bias(GpioBias::PullUp).unwrap();
        let input = bus.as_input().unwrap();
        driver.set_level(2, Some(false)).unwrap();
        driver.close_contact(2, 1);
        assert_eq!(input.read().unwrap(), [true, false]);
        assert_eq!(input.read_bits().unwrap(), 0b01);

        driver.open_contact(1, 2);
        assert_eq!(input.read_bits().unwrap(), 0b11);
    }
}
