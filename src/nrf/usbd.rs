//! nRF52840 USBD backend.
//!
//! Implements the controller's capability traits directly on the USBD
//! registers. Two quirks of this peripheral shape the code:
//!
//! - Every enabled event keeps the interrupt line asserted, so the ISR
//!   clears the events it cares about up front ([`take_events`]) and leaves
//!   the endpoint 0 ones behind as software latches.
//! - SET_ADDRESS is answered by the hardware itself. The latched address
//!   and its status stage are therefore no-ops here.
//!
//! Endpoint data moves by EasyDMA from RAM buffers owned by the endpoint
//! structs; the structs live in a `static` so the buffers never move.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_nrf::interrupt::typelevel::{Binding, Handler, Interrupt, USBD};
use embassy_nrf::pac;

use keymatrix_usb::config::EP0_MAX_PACKET;
use keymatrix_usb::usb::setup::{request, SetupPacket};
use keymatrix_usb::usb::{BusEvents, ControlEndpoint, InterruptEndpoint, UsbBus};
use keymatrix_usb::{Error, Result};

/// Largest interrupt-IN packet the hardware supports.
const EPIN_MAX_PACKET: usize = 64;

static EP0_SETUP: AtomicBool = AtomicBool::new(false);
static EP0_DATA_DONE: AtomicBool = AtomicBool::new(false);

fn regs() -> pac::usbd::Usbd {
    pac::USBD
}

/// USBD interrupt handler, bound in `main` with `bind_interrupts!`.
pub struct InterruptHandler;

impl Handler<USBD> for InterruptHandler {
    unsafe fn on_interrupt() {
        let events = take_events();
        super::with_device(|device| device.poll(events));
    }
}

/// Clear the pending USBD events and translate them for the controller.
fn take_events() -> BusEvents {
    let r = regs();
    let mut events = BusEvents::default();

    if r.events_usbreset().read() != 0 {
        r.events_usbreset().write_value(0);
        events.reset = true;
    }
    if r.events_sof().read() != 0 {
        r.events_sof().write_value(0);
        events.start_of_frame = true;
    }
    if r.events_ep0setup().read() != 0 {
        r.events_ep0setup().write_value(0);
        EP0_SETUP.store(true, Ordering::Release);
    }
    if r.events_ep0datadone().read() != 0 {
        r.events_ep0datadone().write_value(0);
        EP0_DATA_DONE.store(true, Ordering::Release);
    }

    // Every frame also nudges endpoint 0: a status stage the hardware
    // completes on its own raises no event.
    events.control = events.start_of_frame
        || EP0_SETUP.load(Ordering::Acquire)
        || EP0_DATA_DONE.load(Ordering::Acquire);
    events
}

/// Run one EasyDMA transfer into the IN buffer of `ep` and wait for it.
///
/// Only one USBD DMA may run at a time; the wait is a few microseconds.
fn dma_in(ep: usize, data: &[u8]) {
    let r = regs();
    r.epin(ep).ptr().write_value(data.as_ptr() as u32);
    r.epin(ep).maxcnt().write(|w| w.set_maxcnt(data.len() as u8));
    r.events_endepin(ep).write_value(0);
    r.tasks_startepin(ep).write_value(1);
    while r.events_endepin(ep).read() == 0 {}
    r.events_endepin(ep).write_value(0);
}

/// Device-level USBD controls.
pub struct Bus {
    _private: (),
}

impl Bus {
    pub fn new(_irq: impl Binding<USBD, InterruptHandler>) -> Self {
        USBD::unpend();
        // SAFETY: the handler only touches state behind `with_device`.
        unsafe { USBD::enable() };
        Self { _private: () }
    }
}

impl UsbBus for Bus {
    fn attach(&mut self) {
        let r = regs();
        r.enable().write(|w| w.set_enable(true));
        while !r.eventcause().read().ready() {}
        r.eventcause().write(|w| w.set_ready(true));
        r.usbpullup().write(|w| w.set_connect(true));
    }

    fn enable_bus_events(&mut self) {
        regs().intenset().write(|w| {
            w.set_usbreset(true);
            w.set_sof(true);
            w.set_ep0setup(true);
            w.set_ep0datadone(true);
        });
    }

    fn set_address(&mut self, _address: u8) {}

    fn enable_address(&mut self) {}
}

/// Endpoint 0 on the USBD.
pub struct Control {
    buf: [u8; EP0_MAX_PACKET],
    in_busy: bool,
    /// The setup being served is SET_ADDRESS, handled by the hardware.
    hw_set_address: bool,
    /// Data stage bookkeeping, to tell the final DATADONE apart.
    device_to_host: bool,
    requested: usize,
    sent: usize,
    data_done: bool,
}

impl Control {
    pub const fn new() -> Self {
        Self {
            buf: [0; EP0_MAX_PACKET],
            in_busy: false,
            hw_set_address: false,
            device_to_host: false,
            requested: 0,
            sent: 0,
            data_done: false,
        }
    }
}

impl ControlEndpoint for Control {
    fn configure(&mut self, _max_packet: usize) -> Result<()> {
        // Endpoint 0 is fixed at 64 bytes and always enabled.
        EP0_SETUP.store(false, Ordering::Release);
        EP0_DATA_DONE.store(false, Ordering::Release);
        self.in_busy = false;
        self.data_done = false;
        Ok(())
    }

    fn setup_received(&self) -> bool {
        EP0_SETUP.load(Ordering::Acquire)
    }

    fn read_setup(&mut self) -> [u8; 8] {
        let r = regs();
        let raw = [
            r.bmrequesttype().read().0 as u8,
            r.brequest().read().0 as u8,
            r.wvaluel().read().0 as u8,
            r.wvalueh().read().0 as u8,
            r.windexl().read().0 as u8,
            r.windexh().read().0 as u8,
            r.wlengthl().read().0 as u8,
            r.wlengthh().read().0 as u8,
        ];
        let setup = SetupPacket::parse(&raw);
        self.hw_set_address = setup.request_type == 0x00 && setup.request == request::SET_ADDRESS;
        self.device_to_host = setup.request_type & 0x80 != 0;
        self.requested = setup.length as usize;
        self.sent = 0;
        self.data_done = false;
        self.in_busy = false;
        raw
    }

    fn ack_setup(&mut self) {
        EP0_SETUP.store(false, Ordering::Release);
        EP0_DATA_DONE.store(false, Ordering::Release);
    }

    fn in_ready(&self) -> bool {
        !self.in_busy || EP0_DATA_DONE.load(Ordering::Acquire)
    }

    fn send_in(&mut self, data: &[u8]) {
        if !self.device_to_host || self.requested == 0 {
            // Status stage of a control write.
            if !self.hw_set_address {
                regs().tasks_ep0status().write_value(1);
            }
            self.in_busy = false;
            return;
        }

        EP0_DATA_DONE.store(false, Ordering::Release);
        let len = data.len().min(EP0_MAX_PACKET);
        self.buf[..len].copy_from_slice(&data[..len]);
        dma_in(0, &self.buf[..len]);
        self.in_busy = true;

        self.sent += len;
        if len < EP0_MAX_PACKET || self.sent >= self.requested {
            self.data_done = true;
        }
    }

    fn status_out_received(&self) -> bool {
        self.data_done && EP0_DATA_DONE.load(Ordering::Acquire)
    }

    fn ack_status_out(&mut self) {
        EP0_DATA_DONE.store(false, Ordering::Release);
        self.data_done = false;
        self.in_busy = false;
        regs().tasks_ep0status().write_value(1);
    }

    fn stall(&mut self) {
        regs().tasks_ep0stall().write_value(1);
    }
}

/// Interrupt-IN endpoint on the USBD.
pub struct ReportIn {
    number: usize,
    max_packet: usize,
    buf: [u8; EPIN_MAX_PACKET],
    filled: usize,
    busy: bool,
}

impl ReportIn {
    pub const fn new() -> Self {
        Self {
            number: 0,
            max_packet: 0,
            buf: [0; EPIN_MAX_PACKET],
            filled: 0,
            busy: false,
        }
    }
}

impl InterruptEndpoint for ReportIn {
    fn configure(&mut self, number: u8, max_packet: u16) -> Result<()> {
        let n = number as usize;
        if !(1..=7).contains(&n) || max_packet as usize > EPIN_MAX_PACKET {
            return Err(Error::EndpointConfig(number));
        }
        let r = regs();
        r.epinen().modify(|w| w.set_in(n, true));
        r.epdatastatus().write(|w| w.set_epin(n, true));
        self.number = n;
        self.max_packet = max_packet as usize;
        self.filled = 0;
        self.busy = false;
        Ok(())
    }

    fn bank_free(&self) -> bool {
        !self.busy || regs().epdatastatus().read().epin(self.number)
    }

    fn write_room(&self) -> usize {
        self.max_packet - self.filled
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let available = self.write_room();
        if data.len() > available {
            return Err(Error::FifoOverrun {
                needed: data.len(),
                available,
            });
        }
        self.buf[self.filled..self.filled + data.len()].copy_from_slice(data);
        self.filled += data.len();
        Ok(())
    }

    fn commit(&mut self) {
        // Clear the host-acknowledged flag of the previous packet.
        regs().epdatastatus().write(|w| w.set_epin(self.number, true));
        dma_in(self.number, &self.buf[..self.filled]);
        self.filled = 0;
        self.busy = true;
    }
}
