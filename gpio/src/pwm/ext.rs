//! Extension traits for PWM pins.

use std::time::Duration;
use crate::{GpioError, GpioResult};
use crate::pwm::PwmPin;

/// Extension trait for PWM pins, working with durations and audio frequencies instead of raw
/// nanoseconds.
pub trait PwmExtension {
    /// Gets the period of the PWM pin as a [Duration].
    fn period(&self) -> GpioResult<Duration>;
    /// Sets the period of the PWM pin using a [Duration].
    fn set_period(&mut self, period: Duration) -> GpioResult<()>;

    /// Sets the duty cycle of the PWM pin using a [Duration].
    fn set_duty(&mut self, duty: Duration) -> GpioResult<()>;

    /// Configures a square wave (50% duty cycle) of the given frequency.
    ///
    /// Does not enable the channel.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the frequency is zero.
    fn set_square_wave(&mut self, freq_hz: u16) -> GpioResult<()>;
}

impl PwmExtension for dyn PwmPin + '_ {
    fn period(&self) -> GpioResult<Duration> {
        let period_ns = self.period_ns()?;
        Ok(Duration::from_nanos(period_ns.into()))
    }

    fn set_period(&mut self, period: Duration) -> GpioResult<()> {
        let period_ns = u32::try_from(period.as_nanos()).map_err(|_| GpioError::InvalidArgument)?;
        self.set_period_ns(period_ns)
    }

    fn set_duty(&mut self, duty: Duration) -> GpioResult<()> {
        let duty_ns = u32::try_from(duty.as_nanos()).map_err(|_| GpioError::InvalidArgument)?;
        self.set_duty_ns(duty_ns)
    }

    fn set_square_wave(&mut self, freq_hz: u16) -> GpioResult<()> {
        if freq_hz == 0 {
            return Err(GpioError::InvalidArgument);
        }

        let period = Duration::from_secs(1) / u32::from(freq_hz);
        // Lower the duty first so it never exceeds the new period.
        self.set_duty_ns(0)?;
        self.set_period(period)?;
        self.set_duty(period / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPwmPin;

    #[test]
    fn square_wave_is_half_duty() {
        let mut sim = SimPwmPin::default();
        let pin: &mut dyn PwmPin = &mut sim;
        pin.set_square_wave(2000).unwrap();
        assert_eq!(pin.period().unwrap(), Duration::from_micros(500));
        assert_eq!(pin.duty_ns().unwrap(), 250_000);
        assert!(!pin.is_enabled().unwrap());
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let mut sim = SimPwmPin::default();
        let pin: &mut dyn PwmPin = &mut sim;
        assert_eq!(pin.set_square_wave(0), Err(GpioError::InvalidArgument));
    }
}
