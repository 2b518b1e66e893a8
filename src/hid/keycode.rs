//! HID Keyboard/Keypad usages and their place in the input report.
//!
//! A usage is one of two disjoint kinds:
//! - *modifier* (0xE0..=0xE7): one bit of report byte 0, bit `usage - 0xE0`
//! - *regular* (everything else the report can hold): bit `usage % 8` of
//!   byte `1 + usage / 8`

use crate::error::Error;

/// First modifier usage (Left Control).
pub const FIRST_MODIFIER_USAGE: u8 = 0xE0;

/// Last modifier usage (Right GUI).
pub const LAST_MODIFIER_USAGE: u8 = 0xE7;

/// Highest regular usage the report descriptor declares.
pub const LAST_KEY_USAGE: u8 = 0xA4;

/// Keycode for one physical key: a HID usage ID the report has a bit for.
///
/// Only the constructors below build one, so every value is either a
/// modifier (`FIRST_MODIFIER_USAGE..=LAST_MODIFIER_USAGE`) or a regular key
/// (`0..=LAST_KEY_USAGE`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keycode(u8);

impl Keycode {
    /// Classify a raw usage ID. `None` when the report has no bit for it.
    pub const fn new(usage: u8) -> Option<Self> {
        if (usage >= FIRST_MODIFIER_USAGE && usage <= LAST_MODIFIER_USAGE)
            || usage <= LAST_KEY_USAGE
        {
            Some(Keycode(usage))
        } else {
            None
        }
    }

    /// Like [`Keycode::new`], for tables built at compile time: an
    /// unrepresentable usage fails const evaluation.
    pub const fn from_usage(usage: u8) -> Self {
        match Self::new(usage) {
            Some(code) => code,
            None => panic!("usage has no bit in the input report"),
        }
    }

    /// Modifier with bit `bit` of the modifier byte. `None` past bit 7.
    pub const fn modifier(bit: u8) -> Option<Self> {
        if bit < 8 {
            Some(Keycode(FIRST_MODIFIER_USAGE + bit))
        } else {
            None
        }
    }

    /// The HID usage ID.
    pub const fn usage(self) -> u8 {
        self.0
    }

    pub const fn is_modifier(self) -> bool {
        self.0 >= FIRST_MODIFIER_USAGE
    }

    /// Bit position in the modifier byte, for modifiers.
    pub const fn modifier_bit(self) -> Option<u8> {
        if self.is_modifier() {
            Some(self.0 - FIRST_MODIFIER_USAGE)
        } else {
            None
        }
    }

    /// Report byte holding this key's bit.
    pub const fn byte_index(self) -> usize {
        if self.is_modifier() {
            0
        } else {
            1 + (self.0 / 8) as usize
        }
    }

    /// Mask of this key's bit within [`Keycode::byte_index`].
    pub const fn bit_mask(self) -> u8 {
        match self.modifier_bit() {
            Some(bit) => 1 << bit,
            None => 1 << (self.0 % 8),
        }
    }
}

impl TryFrom<u8> for Keycode {
    type Error = Error;

    fn try_from(usage: u8) -> Result<Self, Self::Error> {
        Keycode::new(usage).ok_or(Error::KeycodeOutOfRange(usage))
    }
}

impl From<Keycode> for u8 {
    fn from(code: Keycode) -> u8 {
        code.usage()
    }
}

/// Keyboard/Keypad page usages (HID Usage Tables, section 10).
pub mod usage {
    use super::Keycode;

    const fn k(usage: u8) -> Keycode {
        Keycode::from_usage(usage)
    }

    pub const A: Keycode = k(0x04);
    pub const B: Keycode = k(0x05);
    pub const C: Keycode = k(0x06);
    pub const D: Keycode = k(0x07);
    pub const E: Keycode = k(0x08);
    pub const F: Keycode = k(0x09);
    pub const G: Keycode = k(0x0A);
    pub const H: Keycode = k(0x0B);
    pub const I: Keycode = k(0x0C);
    pub const J: Keycode = k(0x0D);
    pub const K: Keycode = k(0x0E);
    pub const L: Keycode = k(0x0F);
    pub const M: Keycode = k(0x10);
    pub const N: Keycode = k(0x11);
    pub const O: Keycode = k(0x12);
    pub const P: Keycode = k(0x13);
    pub const Q: Keycode = k(0x14);
    pub const R: Keycode = k(0x15);
    pub const S: Keycode = k(0x16);
    pub const T: Keycode = k(0x17);
    pub const U: Keycode = k(0x18);
    pub const V: Keycode = k(0x19);
    pub const W: Keycode = k(0x1A);
    pub const X: Keycode = k(0x1B);
    pub const Y: Keycode = k(0x1C);
    pub const Z: Keycode = k(0x1D);

    pub const KEY_1: Keycode = k(0x1E);
    pub const KEY_2: Keycode = k(0x1F);
    pub const KEY_3: Keycode = k(0x20);
    pub const KEY_4: Keycode = k(0x21);
    pub const KEY_5: Keycode = k(0x22);
    pub const KEY_6: Keycode = k(0x23);
    pub const KEY_7: Keycode = k(0x24);
    pub const KEY_8: Keycode = k(0x25);
    pub const KEY_9: Keycode = k(0x26);
    pub const KEY_0: Keycode = k(0x27);

    pub const ENTER: Keycode = k(0x28);
    pub const ESC: Keycode = k(0x29);
    pub const BACKSPACE: Keycode = k(0x2A);
    pub const TAB: Keycode = k(0x2B);
    pub const SPACE: Keycode = k(0x2C);
    pub const MINUS: Keycode = k(0x2D);
    pub const EQUAL: Keycode = k(0x2E);
    pub const LEFT_BRACE: Keycode = k(0x2F);
    pub const RIGHT_BRACE: Keycode = k(0x30);
    pub const BACKSLASH: Keycode = k(0x31);
    pub const SEMICOLON: Keycode = k(0x33);
    pub const APOSTROPHE: Keycode = k(0x34);
    pub const GRAVE: Keycode = k(0x35);
    pub const COMMA: Keycode = k(0x36);
    pub const DOT: Keycode = k(0x37);
    pub const SLASH: Keycode = k(0x38);

    pub const F1: Keycode = k(0x3A);
    pub const F2: Keycode = k(0x3B);
    pub const F3: Keycode = k(0x3C);
    pub const F4: Keycode = k(0x3D);
    pub const F5: Keycode = k(0x3E);
    pub const F6: Keycode = k(0x3F);
    pub const F7: Keycode = k(0x40);
    pub const F8: Keycode = k(0x41);
    pub const F9: Keycode = k(0x42);
    pub const F10: Keycode = k(0x43);
    pub const F11: Keycode = k(0x44);
    pub const F12: Keycode = k(0x45);

    pub const LEFT_CTRL: Keycode = k(0xE0);
    pub const LEFT_SHIFT: Keycode = k(0xE1);
    pub const LEFT_ALT: Keycode = k(0xE2);
    pub const LEFT_META: Keycode = k(0xE3);
    pub const RIGHT_CTRL: Keycode = k(0xE4);
    pub const RIGHT_SHIFT: Keycode = k(0xE5);
    pub const RIGHT_ALT: Keycode = k(0xE6);
    pub const RIGHT_META: Keycode = k(0xE7);
}
