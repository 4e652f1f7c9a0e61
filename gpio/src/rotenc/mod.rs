use crate::{GpioInput, GpioResult};
use log::trace;

/// Represents the direction of rotation for a rotary encoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RotEncDirection {
    /// Counter-clockwise.
    Left,
    /// Clockwise.
    Right,
}

/// One of the two encoder phases.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RotEncPin {
    A,
    B,
}

/// An edge-driven rotary encoder decoder.
///
/// Meant to be called from the edge interrupt of the encoder lines. Only edges on phase A
/// carry a direction; the level of phase B at that moment tells which way the knob went.
/// One detent therefore yields exactly one direction no matter which phase leads.
///
/// There is no debouncing, so the encoder must produce clean edges.
#[derive(Debug)]
pub struct RotEnc<'a> {
    pub pin_a: &'a dyn GpioInput,
    pub pin_b: &'a dyn GpioInput,
}

impl<'a> RotEnc<'a> {
    /// Direction for an edge on phase A, indexed by `[a_after_edge][b]`.
    ///
    /// A falling while B is low, or rising while B is high, is a step to the right.
    const A_EDGE_DIRECTIONS: [[RotEncDirection; 2]; 2] = [
        // A fell.
        [RotEncDirection::Right, RotEncDirection::Left],
        // A rose.
        [RotEncDirection::Left, RotEncDirection::Right],
    ];

    pub fn new(pin_a: &'a dyn GpioInput, pin_b: &'a dyn GpioInput) -> Self {
        RotEnc { pin_a, pin_b }
    }

    pub fn read_raw(&self) -> GpioResult<(bool, bool)> {
        let a = self.pin_a.read()?;
        let b = self.pin_b.read()?;
        Ok((a, b))
    }

    /// Classifies an edge from the levels seen right after it.
    pub fn classify(edge: RotEncPin, a: bool, b: bool) -> Option<RotEncDirection> {
        match edge {
            RotEncPin::A => Some(Self::A_EDGE_DIRECTIONS[a as usize][b as usize]),
            RotEncPin::B => None,
        }
    }

    /// Handles an edge on one of the encoder pins, returning the direction it encodes, if any.
    pub fn on_edge(&self, edge: RotEncPin) -> GpioResult<Option<RotEncDirection>> {
        let (a, b) = self.read_raw()?;
        let direction = Self::classify(edge, a, b);
        trace!("Encoder edge on {:?} (a: {}, b: {}) -> {:?}", edge, a, b, direction);
        Ok(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioDriver;
    use crate::sim::SimGpioDriver;

    #[test]
    fn four_case_table() {
        use RotEncDirection::*;
        assert_eq!(RotEnc::classify(RotEncPin::A, false, false), Some(Right));
        assert_eq!(RotEnc::classify(RotEncPin::A, true, true), Some(Right));
        assert_eq!(RotEnc::classify(RotEncPin::A, false, true), Some(Left));
        assert_eq!(RotEnc::classify(RotEncPin::A, true, false), Some(Left));
    }

    #[test]
    fn phase_b_edges_carry_no_direction() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            assert_eq!(RotEnc::classify(RotEncPin::B, a, b), None);
        }
    }

    #[test]
    fn one_detent_gives_one_step() {
        let driver = SimGpioDriver::new(2);
        let mut pin_a = driver.get_pin(0).unwrap();
        let mut pin_b = driver.get_pin(1).unwrap();
        let a = pin_a.as_input().unwrap();
        let b = pin_b.as_input().unwrap();
        let encoder = RotEnc::new(&*a, &*b);

        // Both phases idle high, B leads low, then A follows.
        driver.set_level(0, Some(true)).unwrap();
        driver.set_level(1, Some(true)).unwrap();
        let mut steps = Vec::new();

        driver.set_level(1, Some(false)).unwrap();
        steps.extend(encoder.on_edge(RotEncPin::B).unwrap());
        driver.set_level(0, Some(false)).unwrap();
        steps.extend(encoder.on_edge(RotEncPin::A).unwrap());

        assert_eq!(steps, vec![RotEncDirection::Right]);

        // A leads the way back.
        steps.clear();
        driver.set_level(0, Some(true)).unwrap();
        steps.extend(encoder.on_edge(RotEncPin::A).unwrap());
        driver.set_level(1, Some(true)).unwrap();
        steps.extend(encoder.on_edge(RotEncPin::B).unwrap());

        assert_eq!(steps, vec![RotEncDirection::Left]);
    }
}
