//! The USB device: enumeration state, bus event handling and the
//! once-per-frame report push.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config;
use crate::error::Result;
use crate::handoff::ReportSlot;
use crate::hid::REPORT_SIZE;
use crate::usb::control::{self, Action, ControlPipe};
use crate::usb::endpoint::{ControlEndpoint, InterruptEndpoint, UsbBus};
use crate::usb::setup::SetupPacket;

/// Enumeration state, driven by the host's control requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// After attach or bus reset: answering on address 0.
    Default,
    /// SET_ADDRESS completed, no configuration selected.
    Addressed,
    /// SET_CONFIGURATION with a non-zero value; reports flow.
    Configured(u8),
}

/// Bus events pending in one interrupt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusEvents {
    pub reset: bool,
    pub start_of_frame: bool,
    pub control: bool,
}

/// USB HID keyboard device over a register-level backend.
pub struct UsbDevice<'a, B, C, I, M: RawMutex> {
    bus: B,
    control: C,
    reports: I,
    slot: &'a ReportSlot<M>,
    state: DeviceState,
    pipe: ControlPipe,
}

impl<'a, B, C, I, M> UsbDevice<'a, B, C, I, M>
where
    B: UsbBus,
    C: ControlEndpoint,
    I: InterruptEndpoint,
    M: RawMutex,
{
    pub fn new(bus: B, control: C, reports: I, slot: &'a ReportSlot<M>) -> Self {
        Self {
            bus,
            control,
            reports,
            slot,
            state: DeviceState::Default,
            pipe: ControlPipe::new(),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Current `bConfigurationValue`, 0 when not configured.
    pub fn configuration(&self) -> u8 {
        match self.state {
            DeviceState::Configured(value) => value,
            _ => 0,
        }
    }

    /// Connect to the bus. Enumeration starts with the host's first reset.
    pub fn attach(&mut self) {
        self.bus.attach();
        self.bus.enable_bus_events();
        info!("usb: attached");
    }

    /// Handle everything pending, in hardware priority order.
    pub fn poll(&mut self, events: BusEvents) {
        if events.reset {
            if let Err(e) = self.on_reset() {
                error!("usb: reset handling failed: {}", e);
            }
        }
        if events.start_of_frame {
            self.on_start_of_frame();
        }
        if events.control {
            self.on_control();
        }
    }

    /// Bus reset: rebuild both endpoints and forget all enumeration state.
    ///
    /// Safe to call at any moment, including mid-transfer. On an endpoint
    /// configuration failure the device stays unconfigured until the next
    /// reset.
    pub fn on_reset(&mut self) -> Result<()> {
        info!("usb: bus reset");
        self.state = DeviceState::Default;
        self.pipe.abort();

        self.control.configure(config::EP0_MAX_PACKET)?;
        self.reports
            .configure(config::REPORT_ENDPOINT, config::REPORT_ENDPOINT_MAX_PACKET)?;
        self.bus.enable_bus_events();
        Ok(())
    }

    /// Start of frame: push the pending report, if any, into the
    /// interrupt-IN bank.
    ///
    /// With nothing pending the bank is left alone and the hardware keeps
    /// answering with what it last held.
    pub fn on_start_of_frame(&mut self) {
        if !matches!(self.state, DeviceState::Configured(_)) {
            return;
        }
        if !self.reports.bank_free() {
            return;
        }
        let room = self.reports.write_room();
        if room < REPORT_SIZE {
            warn!("usb: report bank has {} bytes, need {}", room, REPORT_SIZE);
            return;
        }
        let Some(report) = self.slot.try_consume() else {
            return;
        };
        match self.reports.write(report.as_bytes()) {
            Ok(()) => {
                self.reports.commit();
                trace!("usb: report queued, modifiers {=u8:#x}", report.modifiers());
            }
            Err(e) => error!("usb: report write failed: {}", e),
        }
    }

    /// Endpoint 0 event: take a new SETUP if there is one, then move the
    /// current transfer along.
    pub fn on_control(&mut self) {
        if self.control.setup_received() {
            let raw = self.control.read_setup();
            self.control.ack_setup();
            if !self.pipe.is_idle() {
                debug!("usb: setup aborts transfer in progress");
                self.pipe.abort();
            }
            self.dispatch(SetupPacket::parse(&raw));
        }

        if let Some(address) = self.pipe.advance(&mut self.control) {
            self.bus.enable_address();
            self.state = if address == 0 {
                DeviceState::Default
            } else {
                DeviceState::Addressed
            };
            info!("usb: address {} enabled", address);
        }
    }

    fn dispatch(&mut self, setup: SetupPacket) {
        debug!(
            "usb: setup type {=u8:#x} request {=u8:#x} value {=u16:#x} length {}",
            setup.request_type,
            setup.request,
            setup.value,
            setup.length
        );

        match control::resolve(&setup, self.configuration()) {
            Ok(Action::Reply(reply)) => self.pipe.begin_read(reply, setup.length),
            Ok(Action::SetAddress(address)) => {
                self.bus.set_address(address);
                self.pipe.begin_status(Some(address));
            }
            Ok(Action::SetConfiguration(value)) => {
                self.state = match (value, self.state) {
                    (0, DeviceState::Default) => DeviceState::Default,
                    (0, _) => DeviceState::Addressed,
                    (value, _) => DeviceState::Configured(value),
                };
                info!("usb: configuration {}", value);
                self.pipe.begin_status(None);
            }
            Err(e) => {
                warn!("usb: stall: {}", e);
                self.control.stall();
            }
        }
    }
}
