//! PWM channel abstraction, used to drive the panel beeper.

mod ext;

use crate::GpioResult;
use std::fmt::Debug;
pub use ext::*;

pub trait PwmPin: Debug {
    fn period_ns(&self) -> GpioResult<u32>;
    fn set_period_ns(&mut self, period_ns: u32) -> GpioResult<()>;

    fn duty_ns(&self) -> GpioResult<u32>;
    fn set_duty_ns(&mut self, duty_ns: u32) -> GpioResult<()>;

    fn polarity(&self) -> GpioResult<PwmPolarity>;
    fn set_polarity(&mut self, polarity: PwmPolarity) -> GpioResult<()>;

    fn is_enabled(&self) -> GpioResult<bool>;
    fn enable(&mut self) -> GpioResult<()>;
    fn disable(&mut self) -> GpioResult<()>;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PwmPolarity {
    #[default]
    Normal,
    Inversed,
}
