//! Hardware capabilities the device controller is written against.
//!
//! A backend implements these once over the USB peripheral's registers;
//! tests implement them over a simulated host. Queries take `&self` and
//! never change hardware state; every transition is an explicit `&mut self`
//! call.

use crate::error::Result;

/// Device-level controls of the USB peripheral.
pub trait UsbBus {
    /// Connect the pull-up so the host sees the device.
    fn attach(&mut self);

    /// Enable the bus reset and start-of-frame event sources.
    fn enable_bus_events(&mut self);

    /// Latch the address from SET_ADDRESS without answering on it yet.
    fn set_address(&mut self, address: u8);

    /// Start answering on the latched address. Called once the status
    /// stage of SET_ADDRESS has completed at the old address.
    fn enable_address(&mut self);
}

/// Endpoint 0.
pub trait ControlEndpoint {
    /// (Re)configure as a control endpoint, dropping any transfer in flight.
    fn configure(&mut self, max_packet: usize) -> Result<()>;

    /// A SETUP packet is waiting.
    fn setup_received(&self) -> bool;

    /// The waiting SETUP packet.
    fn read_setup(&mut self) -> [u8; 8];

    /// Release the SETUP packet so the data or status stage can proceed.
    fn ack_setup(&mut self);

    /// The IN buffer is free: the previous IN packet, if any, was taken by
    /// the host.
    fn in_ready(&self) -> bool;

    /// Queue one IN packet of at most `max_packet` bytes. An empty slice
    /// sends a zero-length packet.
    fn send_in(&mut self, data: &[u8]);

    /// The host sent the zero-length OUT that closes a control read.
    fn status_out_received(&self) -> bool;

    fn ack_status_out(&mut self);

    /// Answer the current request with STALL.
    fn stall(&mut self);
}

/// The interrupt-IN endpoint carrying input reports.
pub trait InterruptEndpoint {
    /// (Re)configure as interrupt IN, dropping anything buffered.
    fn configure(&mut self, number: u8, max_packet: u16) -> Result<()>;

    /// The bank is owned by firmware and may be written.
    fn bank_free(&self) -> bool;

    /// Bytes that can still be written into the bank.
    fn write_room(&self) -> usize;

    /// Copy `data` into the bank. Fails with [`Error::FifoOverrun`] rather
    /// than write past [`InterruptEndpoint::write_room`].
    ///
    /// [`Error::FifoOverrun`]: crate::error::Error::FifoOverrun
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Hand the bank to the hardware for the next IN token.
    fn commit(&mut self);
}
