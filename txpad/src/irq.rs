//! Interrupt-side entry points of the keypad.
//!
//! These run in interrupt context, so they only acknowledge the interrupt, decode what is cheap
//! to decode, and schedule the keypad task. The matrix is never scanned from here.

use std::fmt::Debug;
use log::{trace, warn};
use txpad_gpio::rotenc::{RotEnc, RotEncPin};
use crate::driver::{KeypadTaskData, KEYPAD_TASK};
use crate::sched::Scheduler;

/// Interrupt lines owned by the keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqLine {
    /// Falling edge on any keypad row.
    Keypad,
    /// Any edge on either encoder phase.
    Rotary,
}

/// Clears the pending flag of an interrupt line.
pub trait InterruptAck: Debug {
    fn acknowledge(&self, line: IrqLine);
}

/// No interrupt controller to talk to, as with polled or simulated inputs.
#[derive(Debug, Default)]
pub struct NoAck;

impl InterruptAck for NoAck {
    fn acknowledge(&self, _line: IrqLine) {}
}

#[derive(Debug)]
pub struct KeypadIrq<'a> {
    scheduler: &'a dyn Scheduler<KeypadTaskData>,
    rotenc: RotEnc<'a>,
    ack: &'a dyn InterruptAck,
}

impl<'a> KeypadIrq<'a> {
    pub fn new(
        scheduler: &'a dyn Scheduler<KeypadTaskData>,
        rotenc: RotEnc<'a>,
        ack: &'a dyn InterruptAck,
    ) -> Self {
        KeypadIrq { scheduler, rotenc, ack }
    }

    /// A row went low: some key changed, let the task scan.
    pub fn on_keypad_edge(&self) {
        self.ack.acknowledge(IrqLine::Keypad);
        trace!("Keypad edge.");
        self.scheduler.schedule(KEYPAD_TASK, KeypadTaskData::default(), 0);
    }

    /// An encoder phase changed.
    pub fn on_rotary_edge(&self, pin: RotEncPin) {
        self.ack.acknowledge(IrqLine::Rotary);
        match self.rotenc.on_edge(pin) {
            Ok(Some(direction)) => self.scheduler.schedule(KEYPAD_TASK, KeypadTaskData::step(direction), 0),
            Ok(None) => {}
            Err(e) => warn!("Failed to read encoder: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use txpad_gpio::{GpioError, GpioInput, GpioResult};
    use txpad_gpio::rotenc::RotEncDirection;
    use crate::clock::ManualClock;
    use crate::sched::TickScheduler;

    #[derive(Debug, Default)]
    struct Line {
        level: Cell<bool>,
        broken: Cell<bool>,
    }

    impl GpioInput for Line {
        fn read(&self) -> GpioResult<bool> {
            if self.broken.get() {
                return Err(GpioError::Other("line gone".to_string()));
            }
            Ok(self.level.get())
        }
    }

    #[derive(Debug, Default)]
    struct Acks(RefCell<Vec<IrqLine>>);

    impl InterruptAck for Acks {
        fn acknowledge(&self, line: IrqLine) {
            self.0.borrow_mut().push(line);
        }
    }

    #[test]
    fn keypad_edge_schedules_an_immediate_scan() {
        let clock = ManualClock::new(42);
        let scheduler: TickScheduler<KeypadTaskData, 1> = TickScheduler::new(&clock);
        let (a, b) = (Line::default(), Line::default());
        let acks = Acks::default();
        let irq = KeypadIrq::new(&scheduler, RotEnc::new(&a, &b), &acks);

        irq.on_keypad_edge();

        assert_eq!(scheduler.take_due(), Some((KEYPAD_TASK, KeypadTaskData::default())));
        assert_eq!(*acks.0.borrow(), vec![IrqLine::Keypad]);
    }

    #[test]
    fn encoder_edge_carries_its_direction() {
        let clock = ManualClock::new(0);
        let scheduler: TickScheduler<KeypadTaskData, 1> = TickScheduler::new(&clock);
        let (a, b) = (Line::default(), Line::default());
        let acks = Acks::default();
        let irq = KeypadIrq::new(&scheduler, RotEnc::new(&a, &b), &acks);

        // A fell with B low.
        irq.on_rotary_edge(RotEncPin::A);
        assert_eq!(scheduler.take_due(), Some((KEYPAD_TASK, KeypadTaskData::step(RotEncDirection::Right))));

        // B follows; no step of its own.
        b.level.set(true);
        irq.on_rotary_edge(RotEncPin::B);
        assert_eq!(scheduler.take_due(), None);

        assert_eq!(*acks.0.borrow(), vec![IrqLine::Rotary, IrqLine::Rotary]);
    }

    #[test]
    fn row_edge_keeps_a_pending_step() {
        let clock = ManualClock::new(0);
        let scheduler: TickScheduler<KeypadTaskData, 1> = TickScheduler::new(&clock);
        let (a, b) = (Line::default(), Line::default());
        let irq = KeypadIrq::new(&scheduler, RotEnc::new(&a, &b), &NoAck);

        irq.on_rotary_edge(RotEncPin::A);
        a.level.set(true);
        irq.on_rotary_edge(RotEncPin::A);
        irq.on_keypad_edge();

        let (_, data) = scheduler.take_due().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(scheduler.take_due(), None);
    }

    #[test]
    fn unreadable_encoder_schedules_nothing() {
        let clock = ManualClock::new(0);
        let scheduler: TickScheduler<KeypadTaskData, 1> = TickScheduler::new(&clock);
        let (a, b) = (Line::default(), Line::default());
        a.broken.set(true);
        let irq = KeypadIrq::new(&scheduler, RotEnc::new(&a, &b), &NoAck);

        irq.on_rotary_edge(RotEncPin::A);
        assert_eq!(scheduler.take_due(), None);
    }
}
