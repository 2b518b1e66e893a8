//! HID Report Descriptor for the full-bitmap keyboard, and a short-item
//! parser used to check it.
//!
//! ## HID Report Descriptor Structure
//!
//! A Report Descriptor is a sequence of items. Each short item is a prefix
//! byte `tttt_ss_zz` (tag, type, size code) followed by 0, 1, 2 or 4 data
//! bytes. Items used here:
//! - Global: Usage Page, Logical Minimum/Maximum, Report Size, Report Count
//! - Local: Usage, Usage Minimum/Maximum (cleared after every main item)
//! - Main: Input, Collection, End Collection
//!
//! ## Limitations
//!
//! The parser covers what a keyboard descriptor needs:
//! - Long items are rejected
//! - Push/Pop state is not supported
//! - Delimiter tags are ignored

use heapless::Vec;

use crate::hid::keycode::{FIRST_MODIFIER_USAGE, LAST_KEY_USAGE, LAST_MODIFIER_USAGE};
use crate::hid::report::{KEY_USAGE_COUNT, PADDING_BITS};

/// USB HID Report Descriptor for the keyboard.
///
/// This descriptor tells the USB host that we are a keyboard with:
///   - 8 modifier key bits (input)
///   - 165 key bits, one per usage 0x00..=0xA4 (input)
///   - 3 constant padding bits
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    //
    //   - Modifier keys (8 bits) -
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, FIRST_MODIFIER_USAGE, //   Usage Minimum (Left Control)
    0x29, LAST_MODIFIER_USAGE,  //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Key bitmap (165 bits) -
    0x19, 0x00, //   Usage Minimum (0)
    0x29, LAST_KEY_USAGE, //   Usage Maximum (0xA4)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, KEY_USAGE_COUNT as u8, //   Report Count (165)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Padding to a byte boundary -
    0x75, 0x01, //   Report Size (1)
    0x95, PADDING_BITS as u8, //   Report Count (3)
    0x81, 0x03, //   Input (Constant, Variable, Absolute)
    //
    0xC0, // End Collection
];

/// Most main items a parsed descriptor may hold.
pub const MAX_FIELDS: usize = 8;

/// Usage pages a keyboard descriptor refers to; anything else is kept raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsagePage {
    GenericDesktop,
    Keyboard,
    Other(u16),
}

impl From<u16> for UsagePage {
    fn from(code: u16) -> Self {
        match code {
            0x01 => UsagePage::GenericDesktop,
            0x07 => UsagePage::Keyboard,
            other => UsagePage::Other(other),
        }
    }
}

/// Direction of a main data item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    Input,
    Output,
    Feature,
}

/// One Input/Output/Feature item with the state in force when it was seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportField {
    pub kind: FieldKind,
    pub usage_page: UsagePage,
    /// Usage Minimum/Maximum, or a single Usage as a one-element range.
    /// `None` for padding.
    pub usages: Option<(u16, u16)>,
    pub logical_min: i32,
    pub logical_max: i32,
    /// Bits per element.
    pub report_size: u16,
    /// Number of elements.
    pub report_count: u16,
    /// Constant (padding) rather than data.
    pub constant: bool,
    /// Variable (one bit/value per usage) rather than array.
    pub variable: bool,
}

impl ReportField {
    pub fn bits(&self) -> u32 {
        self.report_size as u32 * self.report_count as u32
    }
}

/// Parsed HID descriptor.
#[derive(Clone, Debug)]
pub struct ParsedDescriptor {
    /// Usage page and usage of the outermost application collection.
    pub application: Option<(UsagePage, u16)>,
    /// Main data items in declaration order.
    pub fields: Vec<ReportField, MAX_FIELDS>,
}

impl ParsedDescriptor {
    /// Total size of the input report in bits.
    pub fn input_bits(&self) -> u32 {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Input)
            .map(ReportField::bits)
            .sum()
    }
}

/// Parse a HID Report Descriptor.
///
/// Returns `None` for truncated items, long items, unbalanced collections or
/// more than [`MAX_FIELDS`] data items.
pub fn parse(data: &[u8]) -> Option<ParsedDescriptor> {
    let mut desc = ParsedDescriptor {
        application: None,
        fields: Vec::new(),
    };

    // Global state.
    let mut usage_page: u16 = 0;
    let mut logical_min: i32 = 0;
    let mut logical_max: i32 = 0;
    let mut report_size: u16 = 0;
    let mut report_count: u16 = 0;

    // Local state, reset after each main item.
    let mut usage: Option<u16> = None;
    let mut usage_min: Option<u16> = None;
    let mut usage_max: Option<u16> = None;

    let mut depth: u8 = 0;

    let mut i = 0;
    while i < data.len() {
        let prefix = data[i];
        if prefix == 0xFE {
            // Long item.
            return None;
        }
        let tag = (prefix >> 4) & 0x0F;
        let item_type = (prefix >> 2) & 0x03;
        let size = match prefix & 0x03 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };

        if i + 1 + size > data.len() {
            return None;
        }

        let raw = &data[i + 1..i + 1 + size];
        let unsigned: u32 = match size {
            0 => 0,
            1 => raw[0] as u32,
            2 => u16::from_le_bytes([raw[0], raw[1]]) as u32,
            _ => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        };
        let signed: i32 = match size {
            0 => 0,
            1 => raw[0] as i8 as i32,
            2 => i16::from_le_bytes([raw[0], raw[1]]) as i32,
            _ => unsigned as i32,
        };

        match item_type {
            // Main items
            0 => {
                let kind = match tag {
                    0x08 => Some(FieldKind::Input),
                    0x09 => Some(FieldKind::Output),
                    0x0B => Some(FieldKind::Feature),
                    // Collection
                    0x0A => {
                        if depth == 0 && unsigned == 0x01 {
                            desc.application = usage
                                .map(|u| (UsagePage::from(usage_page), u));
                        }
                        depth = depth.checked_add(1)?;
                        None
                    }
                    // End Collection
                    0x0C => {
                        depth = depth.checked_sub(1)?;
                        None
                    }
                    _ => None,
                };

                if let Some(kind) = kind {
                    let usages = match (usage_min, usage_max, usage) {
                        (Some(min), Some(max), _) => Some((min, max)),
                        (_, _, Some(u)) => Some((u, u)),
                        _ => None,
                    };
                    let field = ReportField {
                        kind,
                        usage_page: UsagePage::from(usage_page),
                        usages,
                        logical_min,
                        logical_max,
                        report_size,
                        report_count,
                        constant: unsigned & 0x01 != 0,
                        variable: unsigned & 0x02 != 0,
                    };
                    desc.fields.push(field).ok()?;
                }

                usage = None;
                usage_min = None;
                usage_max = None;
            }
            // Global items
            1 => match tag {
                0x00 => usage_page = unsigned as u16,
                0x01 => logical_min = signed,
                0x02 => logical_max = signed,
                0x07 => report_size = unsigned as u16,
                0x09 => report_count = unsigned as u16,
                _ => {}
            },
            // Local items
            2 => match tag {
                0x00 => usage = Some(unsigned as u16),
                0x01 => usage_min = Some(unsigned as u16),
                0x02 => usage_max = Some(unsigned as u16),
                _ => {}
            },
            _ => {}
        }

        i += 1 + size;
    }

    if depth != 0 {
        return None;
    }
    Some(desc)
}
