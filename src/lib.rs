//! Matrix-scanning USB HID keyboard firmware core.
//!
//! Everything except the register-level backend lives here so it can be
//! tested on the host:
//!
//! - [`matrix`]: column-by-column scanner and the snapshot -> report fold
//! - [`hid`]: keycodes, the 22-byte bitmap report and its descriptor
//! - [`handoff`]: single-slot report channel from scan loop to USB interrupt
//! - [`usb`]: hand-written device controller (enumeration, report push)
//!
//! Usage: `cargo test` runs everything here on the host.
//!
//! Note: The embedded binary (main.rs, `--features embedded`) adds the
//! nRF52840 USBD and GPIO backends on top of this library.

#![cfg_attr(not(test), no_std)]

// Must come first: the logging macros are textually scoped.
#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod handoff;
pub mod hid;
pub mod layout;
pub mod matrix;
pub mod usb;

pub use error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - scan, fold and handoff together
// ═══════════════════════════════════════════════════════════════════════════
