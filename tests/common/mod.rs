//! Simulated host and USB peripheral for end-to-end tests.
//!
//! `Wire` is the shared state of a tiny bus: the address the device answers
//! on, what sits in the endpoint buffers, and what the host has seen. The
//! fakes implement the controller's capability traits on top of it, and
//! [`Host`] plays the host side of control and interrupt transfers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;

use keymatrix_usb::config::{COLUMN_COUNT, EP0_MAX_PACKET};
use keymatrix_usb::handoff::ReportSlot;
use keymatrix_usb::matrix::{ColumnDriver, Matrix, RowSensor};
use keymatrix_usb::usb::{BusEvents, ControlEndpoint, InterruptEndpoint, SetupPacket, UsbBus, UsbDevice};
use keymatrix_usb::{Error, Result};

/// One IN packet on endpoint 0, with the address that carried it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InPacket {
    pub address: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Wire {
    // bus
    pub attached: bool,
    pub bus_events_enabled: bool,
    pub address: u8,
    pub latched_address: Option<u8>,

    // endpoint 0
    pub ep0_configured: bool,
    pub setup: Option<[u8; 8]>,
    pub ep0_in: Option<Vec<u8>>,
    pub status_out: bool,
    pub status_out_acks: usize,
    pub stalls: usize,

    // endpoint 1
    pub ep1: Option<(u8, u16)>,
    pub ep1_fails: bool,
    pub ep1_buf: Vec<u8>,
    pub ep1_busy: bool,
    /// Caps the bank's write room below its packet size when set.
    pub ep1_room: Option<usize>,
    pub committed: Vec<Vec<u8>>,
}

pub type Shared = Rc<RefCell<Wire>>;

pub struct FakeBus(pub Shared);

impl UsbBus for FakeBus {
    fn attach(&mut self) {
        self.0.borrow_mut().attached = true;
    }

    fn enable_bus_events(&mut self) {
        self.0.borrow_mut().bus_events_enabled = true;
    }

    fn set_address(&mut self, address: u8) {
        self.0.borrow_mut().latched_address = Some(address);
    }

    fn enable_address(&mut self) {
        let mut w = self.0.borrow_mut();
        if let Some(address) = w.latched_address.take() {
            w.address = address;
        }
    }
}

pub struct FakeControl(pub Shared);

impl ControlEndpoint for FakeControl {
    fn configure(&mut self, max_packet: usize) -> Result<()> {
        assert_eq!(max_packet, EP0_MAX_PACKET);
        let mut w = self.0.borrow_mut();
        w.ep0_configured = true;
        w.setup = None;
        w.ep0_in = None;
        w.status_out = false;
        Ok(())
    }

    fn setup_received(&self) -> bool {
        self.0.borrow().setup.is_some()
    }

    fn read_setup(&mut self) -> [u8; 8] {
        self.0.borrow().setup.unwrap_or_default()
    }

    fn ack_setup(&mut self) {
        self.0.borrow_mut().setup = None;
    }

    fn in_ready(&self) -> bool {
        self.0.borrow().ep0_in.is_none()
    }

    fn send_in(&mut self, data: &[u8]) {
        assert!(data.len() <= EP0_MAX_PACKET, "IN packet over max size");
        let mut w = self.0.borrow_mut();
        assert!(w.ep0_in.is_none(), "IN buffer overwritten");
        w.ep0_in = Some(data.to_vec());
    }

    fn status_out_received(&self) -> bool {
        self.0.borrow().status_out
    }

    fn ack_status_out(&mut self) {
        let mut w = self.0.borrow_mut();
        w.status_out = false;
        w.status_out_acks += 1;
    }

    fn stall(&mut self) {
        self.0.borrow_mut().stalls += 1;
    }
}

pub struct FakeInterrupt(pub Shared);

impl InterruptEndpoint for FakeInterrupt {
    fn configure(&mut self, number: u8, max_packet: u16) -> Result<()> {
        let mut w = self.0.borrow_mut();
        if w.ep1_fails {
            return Err(Error::EndpointConfig(number));
        }
        w.ep1 = Some((number, max_packet));
        w.ep1_buf.clear();
        w.ep1_busy = false;
        Ok(())
    }

    fn bank_free(&self) -> bool {
        !self.0.borrow().ep1_busy
    }

    fn write_room(&self) -> usize {
        let w = self.0.borrow();
        let mut max = w.ep1.map_or(0, |(_, max)| max as usize);
        if let Some(room) = w.ep1_room {
            max = max.min(room);
        }
        max.saturating_sub(w.ep1_buf.len())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let available = self.write_room();
        if data.len() > available {
            return Err(Error::FifoOverrun {
                needed: data.len(),
                available,
            });
        }
        self.0.borrow_mut().ep1_buf.extend_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) {
        let mut w = self.0.borrow_mut();
        let packet = std::mem::take(&mut w.ep1_buf);
        w.committed.push(packet);
        w.ep1_busy = true;
    }
}

pub type TestDevice<'a> =
    UsbDevice<'a, FakeBus, FakeControl, FakeInterrupt, CriticalSectionRawMutex>;

/// Outcome of a control transfer that did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Nobody answered on that address.
    NoDevice,
    /// The device answered with STALL.
    Stalled,
    /// The transfer did not finish within the polling budget.
    Timeout,
}

/// Polling budget per transfer stage.
const MAX_POLLS: usize = 16;

/// The host side of the bus, driving a device under test.
pub struct Host<'a> {
    pub wire: Shared,
    pub device: TestDevice<'a>,
}

impl<'a> Host<'a> {
    /// A device attached to the bus, before the first reset.
    pub fn new(slot: &'a ReportSlot<CriticalSectionRawMutex>) -> Self {
        let wire = Shared::default();
        let mut device = UsbDevice::new(
            FakeBus(wire.clone()),
            FakeControl(wire.clone()),
            FakeInterrupt(wire.clone()),
            slot,
        );
        device.attach();
        Self { wire, device }
    }

    /// Attach plus a first bus reset: ready for enumeration at address 0.
    pub fn connected(slot: &'a ReportSlot<CriticalSectionRawMutex>) -> Self {
        let mut host = Self::new(slot);
        host.reset();
        host
    }

    pub fn reset(&mut self) {
        {
            let mut w = self.wire.borrow_mut();
            w.address = 0;
            w.latched_address = None;
        }
        self.device.poll(BusEvents {
            reset: true,
            ..BusEvents::default()
        });
    }

    /// One frame: SOF to the device, then one interrupt-IN token.
    ///
    /// Returns the report the host read, if the device had one queued.
    pub fn frame(&mut self) -> Option<Vec<u8>> {
        self.device.poll(BusEvents {
            start_of_frame: true,
            ..BusEvents::default()
        });
        let mut w = self.wire.borrow_mut();
        if w.ep1_busy {
            w.ep1_busy = false;
            w.committed.last().cloned()
        } else {
            None
        }
    }

    /// SOF without the host reading the interrupt endpoint afterwards.
    pub fn frame_without_token(&mut self) {
        self.device.poll(BusEvents {
            start_of_frame: true,
            ..BusEvents::default()
        });
    }

    pub fn committed(&self) -> Vec<Vec<u8>> {
        self.wire.borrow().committed.clone()
    }

    pub fn stalls(&self) -> usize {
        self.wire.borrow().stalls
    }

    fn poll_control(&mut self) {
        self.device.poll(BusEvents {
            control: true,
            ..BusEvents::default()
        });
    }

    /// Put a SETUP on the bus. Only a device answering on `address` sees it.
    pub fn send_setup(&mut self, address: u8, setup: SetupPacket) -> std::result::Result<(), Failure> {
        let mut w = self.wire.borrow_mut();
        if !w.attached || !w.ep0_configured || w.address != address {
            return Err(Failure::NoDevice);
        }
        w.setup = Some(setup.to_bytes());
        Ok(())
    }

    /// Take whatever sits in the endpoint 0 IN buffer.
    fn take_in(&mut self) -> Option<InPacket> {
        let mut w = self.wire.borrow_mut();
        let address = w.address;
        w.ep0_in.take().map(|data| InPacket { address, data })
    }

    /// Full control read: SETUP, IN data until a short packet or
    /// `wLength` bytes, then the zero-length OUT status.
    pub fn control_read(
        &mut self,
        address: u8,
        setup: SetupPacket,
    ) -> std::result::Result<Vec<u8>, Failure> {
        let stalls = self.stalls();
        self.send_setup(address, setup)?;

        let mut data = Vec::new();
        let mut polls = 0;
        loop {
            self.poll_control();
            if self.stalls() > stalls {
                return Err(Failure::Stalled);
            }
            if let Some(packet) = self.take_in() {
                let short = packet.data.len() < EP0_MAX_PACKET;
                data.extend_from_slice(&packet.data);
                if short || data.len() >= setup.length as usize {
                    break;
                }
            }
            polls += 1;
            if polls > MAX_POLLS {
                return Err(Failure::Timeout);
            }
        }

        self.wire.borrow_mut().status_out = true;
        self.poll_control();
        if self.wire.borrow().status_out {
            return Err(Failure::Timeout);
        }
        Ok(data)
    }

    /// Control write with no data stage: SETUP, then the device's
    /// zero-length IN status. Returns the status packet.
    pub fn control_write(
        &mut self,
        address: u8,
        setup: SetupPacket,
    ) -> std::result::Result<InPacket, Failure> {
        let stalls = self.stalls();
        self.send_setup(address, setup)?;

        let mut polls = 0;
        let status = loop {
            self.poll_control();
            if self.stalls() > stalls {
                return Err(Failure::Stalled);
            }
            if let Some(packet) = self.take_in() {
                break packet;
            }
            polls += 1;
            if polls > MAX_POLLS {
                return Err(Failure::Timeout);
            }
        };

        // The device sees the status packet go out on its next event.
        self.poll_control();
        Ok(status)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Matrix doubles
// ═══════════════════════════════════════════════════════════════════════════

/// Switch state shared between a test and the fake matrix pins.
pub type Switches = Rc<RefCell<[u8; COLUMN_COUNT]>>;

pub struct FakeColumns {
    switches: Switches,
    driven: Rc<RefCell<Option<usize>>>,
}

pub struct FakeRows {
    switches: Switches,
    driven: Rc<RefCell<Option<usize>>>,
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

impl ColumnDriver for FakeColumns {
    fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    fn drive_column(&mut self, col: usize) {
        let mut driven = self.driven.borrow_mut();
        assert!(driven.is_none(), "two columns driven at once");
        *driven = Some(col);
    }

    fn release_column(&mut self, col: usize) {
        let mut driven = self.driven.borrow_mut();
        assert_eq!(*driven, Some(col));
        *driven = None;
    }
}

impl RowSensor for FakeRows {
    fn read_rows(&mut self) -> u8 {
        match *self.driven.borrow() {
            Some(col) => self.switches.borrow()[col],
            None => 0,
        }
    }
}

pub type FakeMatrix = Matrix<FakeColumns, FakeRows, NoDelay>;

/// A matrix whose closed switches are set through the returned handle.
pub fn fake_matrix() -> (FakeMatrix, Switches) {
    let switches = Switches::default();
    let driven = Rc::new(RefCell::new(None));
    let matrix = Matrix::new(
        FakeColumns {
            switches: switches.clone(),
            driven: driven.clone(),
        },
        FakeRows {
            switches: switches.clone(),
            driven,
        },
        NoDelay,
        0,
    );
    (matrix, switches)
}

