//! nRF52840 backends: USBD register driver and matrix GPIO.
//!
//! The USB device lives in a `static` shared between `start_usb` and the
//! USBD interrupt; the report slot is shared with the scan task.

pub mod board;
pub mod usbd;

use core::cell::RefCell;

use defmt::info;
use embassy_nrf::interrupt::typelevel::{Binding, USBD};
use embassy_nrf::peripherals;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use keymatrix_usb::config;
use keymatrix_usb::handoff::ReportSlot;
use keymatrix_usb::usb::UsbDevice;

pub type Keyboard =
    UsbDevice<'static, usbd::Bus, usbd::Control, usbd::ReportIn, CriticalSectionRawMutex>;

/// Reports from the scan task to the USB interrupt.
pub static REPORTS: ReportSlot<CriticalSectionRawMutex> = ReportSlot::new(config::PENDING_POLICY);

static DEVICE: Mutex<CriticalSectionRawMutex, RefCell<Option<Keyboard>>> =
    Mutex::new(RefCell::new(None));

/// Run `f` on the USB device, if it has been started.
pub fn with_device(f: impl FnOnce(&mut Keyboard)) {
    DEVICE.lock(|cell| {
        if let Some(device) = cell.borrow_mut().as_mut() {
            f(device);
        }
    });
}

/// Build the USB device, attach to the bus and start taking interrupts.
pub fn start_usb(
    _usbd: peripherals::USBD,
    irq: impl Binding<USBD, usbd::InterruptHandler>,
) {
    let bus = usbd::Bus::new(irq);
    let device = UsbDevice::new(bus, usbd::Control::new(), usbd::ReportIn::new(), &REPORTS);
    DEVICE.lock(|cell| {
        let mut slot = cell.borrow_mut();
        let device = slot.insert(device);
        device.attach();
    });
    info!("usb: waiting for host");
}
