//! Application-wide constants and compile-time configuration.
//!
//! Matrix geometry, timing parameters and USB identity live here so they
//! can be tuned in one place.

use crate::handoff::PendingPolicy;

// Key matrix

/// Number of column drive lines, scanned one at a time.
pub const COLUMN_COUNT: usize = 14;

/// Number of row sense lines. Rows are sampled into one `u8`, so at most 8.
pub const ROW_COUNT: usize = 5;

/// Period of the scan loop (ms).
pub const SCAN_PERIOD_MS: u64 = 1;

/// Settle time between driving a column and sampling the rows (µs).
///
/// Empirical: long enough for the matrix RC to charge, short enough to keep
/// a full scan well inside one scan period.
pub const COLUMN_SETTLE_US: u32 = 2;

/// What the handoff does with a changed report while the previous one is
/// still waiting for the next USB frame.
pub const PENDING_POLICY: PendingPolicy = PendingPolicy::RetryNextCycle;

// USB

/// Placeholder VID/PID. Replace with an allocated pair for production.
pub const USB_VID: u16 = 0xF055;
pub const USB_PID: u16 = 0x0000;

/// Device release number (BCD).
pub const USB_DEVICE_RELEASE: u16 = 0x0100;

/// Maximum bus current draw (mA).
pub const USB_MAX_POWER_MA: u16 = 100;

/// Control endpoint max packet size.
pub const EP0_MAX_PACKET: usize = 64;

/// Interrupt-IN endpoint number carrying the input report.
pub const REPORT_ENDPOINT: u8 = 1;

/// Interrupt-IN endpoint max packet size.
pub const REPORT_ENDPOINT_MAX_PACKET: u16 = 32;

/// Interrupt-IN polling interval (frames).
pub const REPORT_POLL_INTERVAL: u8 = 16;

const _: () = assert!(ROW_COUNT <= 8, "rows are sampled into a u8");
const _: () = assert!(
    crate::hid::report::REPORT_SIZE <= REPORT_ENDPOINT_MAX_PACKET as usize,
    "input report must fit one interrupt packet"
);
