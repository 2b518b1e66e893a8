//! Standard and HID class descriptors, as the bytes sent on the wire.
//!
//! The device has one configuration with one HID interface and one
//! interrupt-IN endpoint. A GET_DESCRIPTOR(CONFIGURATION) answers with
//! [`CONFIGURATION_SET`]: configuration, interface, HID and endpoint
//! descriptors back to back.

use crate::config;
use crate::hid::descriptor::REPORT_DESCRIPTOR;
use crate::usb::setup::descriptor_type;

pub const DEVICE_LEN: usize = 18;
pub const CONFIGURATION_LEN: usize = 9;
pub const INTERFACE_LEN: usize = 9;
pub const HID_LEN: usize = 9;
pub const ENDPOINT_LEN: usize = 7;

/// Total length of the configuration descriptor set.
pub const CONFIGURATION_SET_LEN: usize =
    CONFIGURATION_LEN + INTERFACE_LEN + HID_LEN + ENDPOINT_LEN;

/// `bConfigurationValue` of the only configuration.
pub const CONFIGURATION_VALUE: u8 = 1;

/// USB 2.0.
const BCD_USB: u16 = 0x0200;
/// HID 1.11.
const BCD_HID: u16 = 0x0111;

const CLASS_HID: u8 = 0x03;
/// Bus powered; bit 7 is reserved and must be set.
const ATTRIBUTES_BUS_POWERED: u8 = 0x80;
const TRANSFER_INTERRUPT: u8 = 0x03;

const fn lo(v: u16) -> u8 {
    v.to_le_bytes()[0]
}

const fn hi(v: u16) -> u8 {
    v.to_le_bytes()[1]
}

pub const DEVICE: [u8; DEVICE_LEN] = [
    DEVICE_LEN as u8,
    descriptor_type::DEVICE,
    lo(BCD_USB),
    hi(BCD_USB),
    0x00, // bDeviceClass: per interface
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    config::EP0_MAX_PACKET as u8,
    lo(config::USB_VID),
    hi(config::USB_VID),
    lo(config::USB_PID),
    hi(config::USB_PID),
    lo(config::USB_DEVICE_RELEASE),
    hi(config::USB_DEVICE_RELEASE),
    0x00, // iManufacturer
    0x00, // iProduct
    0x00, // iSerialNumber
    0x01, // bNumConfigurations
];

pub const CONFIGURATION: [u8; CONFIGURATION_LEN] = [
    CONFIGURATION_LEN as u8,
    descriptor_type::CONFIGURATION,
    lo(CONFIGURATION_SET_LEN as u16),
    hi(CONFIGURATION_SET_LEN as u16),
    0x01, // bNumInterfaces
    CONFIGURATION_VALUE,
    0x00, // iConfiguration
    ATTRIBUTES_BUS_POWERED,
    (config::USB_MAX_POWER_MA / 2) as u8,
];

pub const INTERFACE: [u8; INTERFACE_LEN] = [
    INTERFACE_LEN as u8,
    descriptor_type::INTERFACE,
    0x00, // bInterfaceNumber
    0x00, // bAlternateSetting
    0x01, // bNumEndpoints
    CLASS_HID,
    0x00, // bInterfaceSubClass: no boot interface
    0x00, // bInterfaceProtocol
    0x00, // iInterface
];

pub const HID: [u8; HID_LEN] = [
    HID_LEN as u8,
    descriptor_type::HID,
    lo(BCD_HID),
    hi(BCD_HID),
    0x00, // bCountryCode
    0x01, // bNumDescriptors
    descriptor_type::REPORT,
    lo(REPORT_DESCRIPTOR.len() as u16),
    hi(REPORT_DESCRIPTOR.len() as u16),
];

pub const ENDPOINT: [u8; ENDPOINT_LEN] = [
    ENDPOINT_LEN as u8,
    descriptor_type::ENDPOINT,
    0x80 | config::REPORT_ENDPOINT,
    TRANSFER_INTERRUPT,
    lo(config::REPORT_ENDPOINT_MAX_PACKET),
    hi(config::REPORT_ENDPOINT_MAX_PACKET),
    config::REPORT_POLL_INTERVAL,
];

/// Configuration, interface, HID and endpoint descriptors concatenated.
pub const CONFIGURATION_SET: [u8; CONFIGURATION_SET_LEN] = concat();

const fn concat() -> [u8; CONFIGURATION_SET_LEN] {
    let parts: [&[u8]; 4] = [&CONFIGURATION, &INTERFACE, &HID, &ENDPOINT];
    let mut out = [0u8; CONFIGURATION_SET_LEN];
    let mut at = 0;
    let mut p = 0;
    while p < parts.len() {
        let part = parts[p];
        let mut i = 0;
        while i < part.len() {
            out[at + i] = part[i];
            i += 1;
        }
        at += part.len();
        p += 1;
    }
    assert!(at == CONFIGURATION_SET_LEN);
    out
}

const _: () = assert!(config::USB_MAX_POWER_MA <= 500);
const _: () = assert!(REPORT_DESCRIPTOR.len() <= u16::MAX as usize);
