//! Control transfers on endpoint 0.
//!
//! [`resolve`] is the request table: it maps a SETUP packet to what the
//! device must do, or to an error that becomes a STALL. [`ControlPipe`]
//! then walks the transfer through its stages one endpoint event at a
//! time:
//!
//! ```text
//! control read:   SETUP -> DataIn (1..n packets, maybe a ZLP) -> StatusOut
//! control write:  SETUP -> StatusIn (device sends ZLP, waits for the ACK)
//! ```
//!
//! A SETUP always wins: whatever stage was in progress is dropped.

use crate::config::EP0_MAX_PACKET;
use crate::error::{Error, Result};
use crate::hid::descriptor::REPORT_DESCRIPTOR;
use crate::usb::descriptor;
use crate::usb::endpoint::ControlEndpoint;
use crate::usb::setup::{descriptor_type, request, Direction, Recipient, RequestKind, SetupPacket};

/// Data for the IN stage of a control read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// A descriptor or other constant.
    Static(&'static [u8]),
    /// Up to two bytes computed at request time.
    Inline([u8; 2], u8),
}

impl Reply {
    fn inline(data: &[u8]) -> Self {
        let mut bytes = [0; 2];
        let len = data.len().min(2);
        bytes[..len].copy_from_slice(&data[..len]);
        Reply::Inline(bytes, len as u8)
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Reply::Static(data) => data,
            Reply::Inline(bytes, len) => &bytes[..*len as usize],
        }
    }
}

/// What a SETUP packet asks of the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Control read: send the reply, clamped to `wLength`.
    Reply(Reply),
    /// Latch the address; enable it after the status stage.
    SetAddress(u8),
    /// Select a configuration (0 deconfigures).
    SetConfiguration(u8),
}

/// Look up a request in the dispatch table.
///
/// `configuration` is the current `bConfigurationValue` (0 when not
/// configured). Anything not in the table, HID class requests included,
/// is [`Error::UnsupportedRequest`]; a known request with the wrong
/// direction or an impossible field is [`Error::MalformedSetup`].
pub fn resolve(setup: &SetupPacket, configuration: u8) -> Result<Action> {
    let unsupported = Error::UnsupportedRequest {
        request_type: setup.request_type,
        request: setup.request,
    };

    if setup.kind() != RequestKind::Standard {
        return Err(unsupported);
    }

    match (setup.recipient(), setup.request) {
        (Recipient::Device | Recipient::Interface | Recipient::Endpoint, request::GET_STATUS) => {
            expect_direction(setup, Direction::In)?;
            Ok(Action::Reply(Reply::inline(&[0, 0])))
        }
        (Recipient::Device, request::GET_CONFIGURATION) => {
            expect_direction(setup, Direction::In)?;
            Ok(Action::Reply(Reply::inline(&[configuration])))
        }
        (Recipient::Interface, request::GET_INTERFACE) => {
            expect_direction(setup, Direction::In)?;
            Ok(Action::Reply(Reply::inline(&[0])))
        }
        (Recipient::Device, request::SET_ADDRESS) => {
            expect_direction(setup, Direction::Out)?;
            if setup.value > 0x7F {
                return Err(Error::MalformedSetup);
            }
            Ok(Action::SetAddress(setup.value as u8))
        }
        (Recipient::Device, request::SET_CONFIGURATION) => {
            expect_direction(setup, Direction::Out)?;
            Ok(Action::SetConfiguration(setup.value as u8))
        }
        (Recipient::Device, request::GET_DESCRIPTOR) => {
            expect_direction(setup, Direction::In)?;
            match (setup.descriptor_type(), setup.descriptor_index()) {
                (descriptor_type::DEVICE, 0) => Ok(Action::Reply(Reply::Static(&descriptor::DEVICE))),
                (descriptor_type::CONFIGURATION, 0) => {
                    Ok(Action::Reply(Reply::Static(&descriptor::CONFIGURATION_SET)))
                }
                _ => Err(unsupported),
            }
        }
        (Recipient::Interface, request::GET_DESCRIPTOR) => {
            expect_direction(setup, Direction::In)?;
            match (setup.descriptor_type(), setup.index) {
                (descriptor_type::REPORT, 0) => Ok(Action::Reply(Reply::Static(REPORT_DESCRIPTOR))),
                _ => Err(unsupported),
            }
        }
        _ => Err(unsupported),
    }
}

fn expect_direction(setup: &SetupPacket, direction: Direction) -> Result<()> {
    if setup.direction() == direction {
        Ok(())
    } else {
        Err(Error::MalformedSetup)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Idle,
    /// Sending `reply[sent..len]`; `zlp` if a zero-length packet must
    /// follow a final full-size packet.
    DataIn {
        reply: Reply,
        len: u16,
        sent: u16,
        zlp: bool,
    },
    /// Data sent, waiting for the host's zero-length OUT.
    StatusOut,
    /// Zero-length IN queued (`sent`) or about to be; `address` is enabled
    /// once the host has taken it.
    StatusIn { sent: bool, address: Option<u8> },
}

/// Stage tracker for the transfer in progress on endpoint 0.
#[derive(Debug)]
pub struct ControlPipe {
    phase: Phase,
}

impl Default for ControlPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPipe {
    pub const fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Drop whatever transfer was in progress.
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Start a control read of `reply`, clamped to the host's `requested`
    /// length.
    pub fn begin_read(&mut self, reply: Reply, requested: u16) {
        if requested == 0 {
            // No data stage; the device answers the status stage.
            self.phase = Phase::StatusIn {
                sent: false,
                address: None,
            };
            return;
        }
        let len = reply.bytes().len().min(requested as usize) as u16;
        let zlp = len < requested && (len as usize) % EP0_MAX_PACKET == 0;
        self.phase = Phase::DataIn {
            reply,
            len,
            sent: 0,
            zlp,
        };
    }

    /// Start the status stage of a control write. `address`, if any, is
    /// handed back by [`ControlPipe::advance`] once the stage completes.
    pub fn begin_status(&mut self, address: Option<u8>) {
        self.phase = Phase::StatusIn {
            sent: false,
            address,
        };
    }

    /// Move the transfer on by at most one packet.
    ///
    /// Returns the address to enable when a SET_ADDRESS status stage has
    /// just completed.
    pub fn advance<C: ControlEndpoint>(&mut self, ep: &mut C) -> Option<u8> {
        match self.phase {
            Phase::Idle => None,
            Phase::DataIn {
                reply,
                len,
                sent,
                zlp,
            } => {
                if ep.status_out_received() {
                    // Host moved to the status stage before taking everything.
                    ep.ack_status_out();
                    self.phase = Phase::Idle;
                    return None;
                }
                if !ep.in_ready() {
                    return None;
                }
                let start = sent as usize;
                let chunk = (len as usize - start).min(EP0_MAX_PACKET);
                ep.send_in(&reply.bytes()[start..start + chunk]);
                trace!("control: sent {} bytes", chunk);

                let sent = sent + chunk as u16;
                self.phase = if sent < len {
                    Phase::DataIn {
                        reply,
                        len,
                        sent,
                        zlp,
                    }
                } else if zlp && chunk == EP0_MAX_PACKET {
                    Phase::DataIn {
                        reply,
                        len,
                        sent,
                        zlp: false,
                    }
                } else {
                    Phase::StatusOut
                };
                None
            }
            Phase::StatusOut => {
                if ep.status_out_received() {
                    ep.ack_status_out();
                    self.phase = Phase::Idle;
                }
                None
            }
            Phase::StatusIn {
                sent: false,
                address,
            } => {
                if ep.in_ready() {
                    ep.send_in(&[]);
                    self.phase = Phase::StatusIn {
                        sent: true,
                        address,
                    };
                }
                None
            }
            Phase::StatusIn {
                sent: true,
                address,
            } => {
                if ep.in_ready() {
                    self.phase = Phase::Idle;
                    address
                } else {
                    None
                }
            }
        }
    }
}
