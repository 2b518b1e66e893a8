//! USB device controller - a single-configuration HID keyboard.
//!
//! No USB stack is involved: the controller drives the peripheral through
//! the capability traits in [`endpoint`] and implements enumeration itself.
//!
//! - Endpoint 0: control, 64-byte packets
//! - Endpoint 1: interrupt IN, one 22-byte input report per frame at most
//!
//! Everything here runs in the USB interrupt. The report crosses over from
//! the scan loop through [`crate::handoff::ReportSlot`].

pub mod control;
pub mod descriptor;
pub mod device;
pub mod endpoint;
pub mod setup;

pub use device::{BusEvents, DeviceState, UsbDevice};
pub use endpoint::{ControlEndpoint, InterruptEndpoint, UsbBus};
pub use setup::SetupPacket;
