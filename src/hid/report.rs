//! USB HID keyboard input report (full-bitmap layout).
//!
//! Layout (22 bytes):
//! ```text
//! Byte 0:     Modifier keys (bitfield)
//!             Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!             Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!             Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!             Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1-21:  One bit per usage 0x00..=0xA4, usage N at bit N % 8 of
//!             byte 1 + N / 8; the top 3 bits of byte 21 are padding
//! ```
//!
//! This is not the 6-key boot layout: every key has its own bit, so any
//! number of keys can be down at once.

use super::keycode::{Keycode, FIRST_MODIFIER_USAGE, LAST_KEY_USAGE};

/// Number of regular usages the report carries (0x00..=0xA4).
pub const KEY_USAGE_COUNT: usize = LAST_KEY_USAGE as usize + 1;

/// Padding bits that round the key field up to a byte multiple.
pub const PADDING_BITS: usize = (8 - KEY_USAGE_COUNT % 8) % 8;

/// Input report size in bytes.
pub const REPORT_SIZE: usize = 1 + (KEY_USAGE_COUNT + PADDING_BITS) / 8;

const _: () = assert!(REPORT_SIZE == 22);

/// Keyboard input report with one bit per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    bytes: [u8; REPORT_SIZE],
}

impl Default for KeyboardReport {
    fn default() -> Self {
        Self::empty()
    }
}

impl KeyboardReport {
    /// Create an empty (all-keys-released) report.
    pub const fn empty() -> Self {
        Self {
            bytes: [0; REPORT_SIZE],
        }
    }

    /// Parse from raw report bytes. `None` when `data` is not exactly one
    /// report or sets a padding bit.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let bytes: [u8; REPORT_SIZE] = data.try_into().ok()?;
        if bytes[REPORT_SIZE - 1] & !padding_free_mask() != 0 {
            return None;
        }
        Some(Self { bytes })
    }

    /// Raw report bytes, as sent on the interrupt-IN endpoint.
    pub const fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.bytes
    }

    /// Modifier bitfield (byte 0).
    pub const fn modifiers(&self) -> u8 {
        self.bytes[0]
    }

    /// Mark `code` pressed or released.
    pub fn set(&mut self, code: Keycode, pressed: bool) {
        let byte = &mut self.bytes[code.byte_index()];
        if pressed {
            *byte |= code.bit_mask();
        } else {
            *byte &= !code.bit_mask();
        }
    }

    pub fn press(&mut self, code: Keycode) {
        self.set(code, true);
    }

    pub fn release(&mut self, code: Keycode) {
        self.set(code, false);
    }

    pub fn is_pressed(&self, code: Keycode) -> bool {
        self.bytes[code.byte_index()] & code.bit_mask() != 0
    }

    /// Returns `true` if no keys are pressed (release event).
    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Pressed keys, modifiers first, then regular keys by usage.
    pub fn pressed(&self) -> impl Iterator<Item = Keycode> + '_ {
        let modifiers = (0..8u8)
            .filter_map(Keycode::modifier)
            .filter(move |&code| self.is_pressed(code));
        let keys = (0..=LAST_KEY_USAGE)
            .filter_map(Keycode::new)
            .filter(move |&code| self.is_pressed(code));
        modifiers.chain(keys)
    }

    /// Number of keys down, modifiers included.
    pub fn pressed_count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }
}

/// Bits of the last report byte that belong to real usages.
const fn padding_free_mask() -> u8 {
    0xFF >> PADDING_BITS
}

const _: () = assert!(FIRST_MODIFIER_USAGE > LAST_KEY_USAGE);
