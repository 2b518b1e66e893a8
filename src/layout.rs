//! Reference 14 column × 5 row layout.
//!
//! Indexed `[column][row]`, columns left to right, rows top (function row)
//! to bottom.

use crate::config::{COLUMN_COUNT, ROW_COUNT};
use crate::hid::keycode::usage::*;
use crate::matrix::Keymap;

#[rustfmt::skip]
pub const KEYMAP: Keymap<COLUMN_COUNT, ROW_COUNT> = [
    [LEFT_ALT,   GRAVE,  TAB,         BACKSPACE,   LEFT_SHIFT],
    [F1,         KEY_1,  Q,           A,           Z],
    [F2,         KEY_2,  W,           S,           X],
    [F3,         KEY_3,  E,           D,           C],
    [F4,         KEY_4,  R,           F,           V],
    [F5,         KEY_5,  T,           G,           B],
    [F6,         KEY_6,  LEFT_CTRL,   SPACE,       APOSTROPHE],
    [F7,         KEY_7,  RIGHT_CTRL,  RIGHT_BRACE, LEFT_BRACE],
    [F8,         KEY_8,  Y,           H,           N],
    [F9,         KEY_9,  U,           J,           M],
    [F10,        KEY_0,  I,           K,           COMMA],
    [F11,        MINUS,  O,           L,           DOT],
    [F12,        EQUAL,  P,           SEMICOLON,   SLASH],
    [RIGHT_META, ESC,    BACKSLASH,   ENTER,       RIGHT_SHIFT],
];

/// Matrix position of `code`, if any key produces it.
pub fn position_of(code: crate::hid::Keycode) -> Option<(usize, usize)> {
    KEYMAP.iter().enumerate().find_map(|(col, keys)| {
        keys.iter()
            .position(|&k| k == code)
            .map(|row| (col, row))
    })
}
