use std::fmt::{Debug, Display, Formatter};

/// A single logical key of the front panel.
///
/// Every key owns exactly one bit, so codes can be collected into a bitmask by the layers
/// above. There is no "no key" code; absence is expressed with [Option::None].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct KeyCode(u16);

impl KeyCode {
    /// Channel 1 trim up.
    pub const CH1_UP: KeyCode = KeyCode(1 << 0);
    /// Channel 1 trim down.
    pub const CH1_DN: KeyCode = KeyCode(1 << 1);
    /// Channel 2 trim up.
    pub const CH2_UP: KeyCode = KeyCode(1 << 2);
    /// Channel 2 trim down.
    pub const CH2_DN: KeyCode = KeyCode(1 << 3);
    /// Channel 3 trim up.
    pub const CH3_UP: KeyCode = KeyCode(1 << 4);
    /// Channel 3 trim down.
    pub const CH3_DN: KeyCode = KeyCode(1 << 5);
    /// Channel 4 trim up.
    pub const CH4_UP: KeyCode = KeyCode(1 << 6);
    /// Channel 4 trim down.
    pub const CH4_DN: KeyCode = KeyCode(1 << 7);
    /// The select key. Held long, it turns into [KeyCode::MENU].
    pub const SEL: KeyCode = KeyCode(1 << 8);
    pub const OK: KeyCode = KeyCode(1 << 9);
    pub const CANCEL: KeyCode = KeyCode(1 << 10);
    /// Rotary encoder turned counter-clockwise.
    pub const LEFT: KeyCode = KeyCode(1 << 11);
    /// Rotary encoder turned clockwise.
    pub const RIGHT: KeyCode = KeyCode(1 << 12);
    /// Synthesized from a long press of [KeyCode::SEL].
    pub const MENU: KeyCode = KeyCode(1 << 13);

    /// Every key, in bit order.
    pub const ALL: [KeyCode; 14] = [
        KeyCode::CH1_UP, KeyCode::CH1_DN,
        KeyCode::CH2_UP, KeyCode::CH2_DN,
        KeyCode::CH3_UP, KeyCode::CH3_DN,
        KeyCode::CH4_UP, KeyCode::CH4_DN,
        KeyCode::SEL, KeyCode::OK, KeyCode::CANCEL,
        KeyCode::LEFT, KeyCode::RIGHT, KeyCode::MENU,
    ];

    /// The bit owned by this key.
    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyCode::CH1_UP => "CH1_UP",
            KeyCode::CH1_DN => "CH1_DN",
            KeyCode::CH2_UP => "CH2_UP",
            KeyCode::CH2_DN => "CH2_DN",
            KeyCode::CH3_UP => "CH3_UP",
            KeyCode::CH3_DN => "CH3_DN",
            KeyCode::CH4_UP => "CH4_UP",
            KeyCode::CH4_DN => "CH4_DN",
            KeyCode::SEL => "SEL",
            KeyCode::OK => "OK",
            KeyCode::CANCEL => "CANCEL",
            KeyCode::LEFT => "LEFT",
            KeyCode::RIGHT => "RIGHT",
            KeyCode::MENU => "MENU",
            _ => "?",
        }
    }
}

impl Debug for KeyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyCode::{}", self.name())
    }
}

impl Display for KeyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_owns_a_distinct_bit() {
        let mut seen = 0u16;
        for key in KeyCode::ALL {
            assert_eq!(key.bits().count_ones(), 1, "{key:?}");
            assert_eq!(seen & key.bits(), 0, "{key:?} overlaps");
            seen |= key.bits();
        }
    }

    #[test]
    fn keys_print_by_name() {
        assert_eq!(KeyCode::CH3_DN.to_string(), "CH3_DN");
        assert_eq!(format!("{:?}", KeyCode::MENU), "KeyCode::MENU");
        assert!(KeyCode::ALL.iter().all(|key| key.name() != "?"));
    }
}
