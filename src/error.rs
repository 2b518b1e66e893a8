//! Unified error type for keymatrix-usb.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! None of these reach a user surface: request errors become a STALL on
//! endpoint 0, everything else is logged and healed by the next bus reset.

use core::fmt;

/// Result type used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // USB
    /// The controller refused the layout requested for this endpoint.
    EndpointConfig(u8),

    /// No handler for this (request code, request type) pair.
    UnsupportedRequest { request_type: u8, request: u8 },

    /// SETUP packet whose direction contradicts its request code.
    MalformedSetup,

    /// IN endpoint has less write room than the packet needs.
    FifoOverrun { needed: usize, available: usize },

    // HID
    /// Keycode has no bit in the input report layout.
    KeycodeOutOfRange(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndpointConfig(ep) => write!(f, "endpoint {} configuration rejected", ep),
            Self::UnsupportedRequest {
                request_type,
                request,
            } => write!(
                f,
                "unsupported request {:#04x} (type {:#04x})",
                request, request_type
            ),
            Self::MalformedSetup => write!(f, "malformed setup packet"),
            Self::FifoOverrun { needed, available } => write!(
                f,
                "fifo overrun: {} bytes needed, {} available",
                needed, available
            ),
            Self::KeycodeOutOfRange(code) => write!(f, "keycode {:#04x} outside report", code),
        }
    }
}
