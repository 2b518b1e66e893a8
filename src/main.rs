//! keymatrix-usb firmware for the nRF52840.
//!
//! Two execution contexts share one report slot:
//!
//! - the scan task, woken every millisecond, scans the matrix, folds it
//!   into a report and offers it to the slot
//! - the USBD interrupt runs the device controller and takes the report
//!   out on start-of-frame once the host is configured
//!
//! Flash with `cargo run --release --features embedded`.

#![no_std]
#![no_main]

mod nrf;

use defmt::{info, trace};
use embassy_executor::Spawner;
use embassy_nrf::bind_interrupts;
use embassy_nrf::config::{Config, HfclkSource};
use embassy_time::{Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use keymatrix_usb::config::{COLUMN_COUNT, SCAN_PERIOD_MS};
use keymatrix_usb::layout::KEYMAP;
use keymatrix_usb::matrix::fold;

use nrf::board::{self, BoardMatrix};

bind_interrupts!(struct Irqs {
    USBD => nrf::usbd::InterruptHandler;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("keymatrix-usb starting");

    // USBD only runs from the external crystal.
    let mut config = Config::default();
    config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(config);

    #[rustfmt::skip]
    let columns = [
        board::column(p.P0_02), board::column(p.P0_03), board::column(p.P0_04),
        board::column(p.P0_05), board::column(p.P0_28), board::column(p.P0_29),
        board::column(p.P0_30), board::column(p.P0_31), board::column(p.P1_10),
        board::column(p.P1_11), board::column(p.P1_12), board::column(p.P1_13),
        board::column(p.P1_14), board::column(p.P1_15),
    ];
    #[rustfmt::skip]
    let rows = [
        board::row(p.P0_11), board::row(p.P0_12), board::row(p.P0_13),
        board::row(p.P0_14), board::row(p.P0_15),
    ];
    let matrix = board::matrix(columns, rows);

    nrf::start_usb(p.USBD, Irqs);
    spawner.must_spawn(scan_task(matrix));
}

#[embassy_executor::task]
async fn scan_task(mut matrix: BoardMatrix) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(SCAN_PERIOD_MS));
    loop {
        let snapshot = matrix.scan::<COLUMN_COUNT>();
        let report = fold(&snapshot, &KEYMAP);
        if nrf::REPORTS.try_publish(&report) {
            trace!("scan: published {} keys", report.pressed_count());
        }
        ticker.next().await;
    }
}
