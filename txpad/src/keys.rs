use std::fmt::{Debug, Formatter};
use txpad_gpio::keypad::KeyCode;

/// A set of keys, one bit per [KeyCode].
///
/// Used as the accumulator of keys pressed since the last poll: the keypad task inserts,
/// pollers [take](KeySet::take) one key at a time.
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct KeySet(u16);

impl KeySet {
    pub const fn new() -> Self {
        KeySet(0)
    }

    pub const fn of(keys: &[KeyCode]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < keys.len() {
            bits |= keys[i].bits();
            i += 1;
        }
        KeySet(bits)
    }

    pub const fn contains(self, key: KeyCode) -> bool {
        self.0 & key.bits() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, key: KeyCode) {
        self.0 |= key.bits();
    }

    /// Removes `key`, returning whether it was present. Other keys are left alone.
    pub fn take(&mut self, key: KeyCode) -> bool {
        let present = self.contains(key);
        self.0 &= !key.bits();
        present
    }

    pub fn iter(self) -> impl Iterator<Item = KeyCode> {
        KeyCode::ALL.into_iter().filter(move |&key| self.contains(key))
    }
}

impl Debug for KeySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_only_the_asked_key() {
        let mut set = KeySet::new();
        set.insert(KeyCode::CH1_UP);
        set.insert(KeyCode::OK);

        assert!(set.take(KeyCode::OK));
        assert!(!set.take(KeyCode::OK));
        assert!(set.contains(KeyCode::CH1_UP));
        assert!(set.take(KeyCode::CH1_UP));
        assert!(set.is_empty());
    }

    #[test]
    fn inserting_twice_is_one_press() {
        let mut set = KeySet::new();
        set.insert(KeyCode::LEFT);
        set.insert(KeyCode::LEFT);
        assert!(set.take(KeyCode::LEFT));
        assert!(!set.take(KeyCode::LEFT));
    }

    #[test]
    fn iterates_in_bit_order() {
        let set = KeySet::of(&[KeyCode::MENU, KeyCode::CH2_DN]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![KeyCode::CH2_DN, KeyCode::MENU]);
    }
}
