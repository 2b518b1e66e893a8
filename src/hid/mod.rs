//! HID keyboard codec: keycodes, the full-bitmap input report and its
//! report descriptor.
//!
//! Everything here is pure data manipulation with no hardware access, so
//! the scan loop and the USB controller can both lean on it and it can be
//! tested on the host.

pub mod descriptor;
pub mod keycode;
pub mod report;


pub use keycode::Keycode;
pub use report::{KeyboardReport, REPORT_SIZE};
