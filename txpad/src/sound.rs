//! Audio feedback.

use log::{debug, warn};
use txpad_gpio::GpioResult;
use txpad_gpio::pwm::{PwmExtension, PwmPin};
use crate::clock::{elapsed, TickClock, Ticks};

/// Something that can play a tone. Fire-and-forget: failures are the sink's problem.
pub trait ToneSink {
    fn play_tone(&mut self, freq_hz: u16, duration_ms: u16);
}

/// Plays tones as a square wave on a PWM channel.
///
/// The tone is started immediately; [PwmBeeper::update] must be called regularly from the main
/// loop to silence it once its duration has passed. Assumes one clock tick per millisecond.
#[derive(Debug)]
pub struct PwmBeeper<'a> {
    pwm: &'a mut dyn PwmPin,
    clock: &'a dyn TickClock,
    /// Tick the tone started at and its length.
    tone: Option<(Ticks, Ticks)>,
}

impl<'a> PwmBeeper<'a> {
    pub fn new(pwm: &'a mut dyn PwmPin, clock: &'a dyn TickClock) -> Self {
        PwmBeeper { pwm, clock, tone: None }
    }

    pub fn is_playing(&self) -> bool {
        self.tone.is_some()
    }

    fn start(&mut self, freq_hz: u16, duration_ms: u16) -> GpioResult<()> {
        if self.tone.is_some() {
            debug!("Tone already playing, restarting.");
        }
        self.pwm.set_square_wave(freq_hz)?;
        if !self.pwm.is_enabled()? {
            self.pwm.enable()?;
        }
        self.tone = Some((self.clock.ticks(), Ticks::from(duration_ms)));
        Ok(())
    }

    /// Disables the PWM channel when the current tone is over.
    pub fn update(&mut self) -> GpioResult<()> {
        if let Some((start, length)) = self.tone {
            if elapsed(self.clock.ticks(), start) >= length {
                self.tone = None;
                self.pwm.disable()?;
            }
        }
        Ok(())
    }
}

impl ToneSink for PwmBeeper<'_> {
    fn play_tone(&mut self, freq_hz: u16, duration_ms: u16) {
        if let Err(e) = self.start(freq_hz, duration_ms) {
            warn!("Failed to play {} Hz tone: {}", freq_hz, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use txpad_gpio::sim::SimPwmPin;

    #[test]
    fn tone_stops_after_its_duration() {
        let clock = ManualClock::new(0);
        let mut pwm = SimPwmPin::default();
        {
            let mut beeper = PwmBeeper::new(&mut pwm, &clock);
            beeper.play_tone(1000, 40);
            assert!(beeper.is_playing());

            clock.set(39);
            beeper.update().unwrap();
            assert!(beeper.is_playing());

            clock.set(40);
            beeper.update().unwrap();
            assert!(!beeper.is_playing());
        }
        assert!(!pwm.is_enabled().unwrap());
        assert_eq!(pwm.period_ns().unwrap(), 1_000_000);
        assert_eq!(pwm.starts, 1);
    }

    #[test]
    fn bad_frequency_is_swallowed() {
        let clock = ManualClock::new(0);
        let mut pwm = SimPwmPin::default();
        let mut beeper = PwmBeeper::new(&mut pwm, &clock);
        beeper.play_tone(0, 40);
        assert!(!beeper.is_playing());
    }
}
