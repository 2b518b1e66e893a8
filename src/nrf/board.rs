//! Matrix wiring on the nRF52840 board.
//!
//! Columns are push-pull outputs driven high one at a time; rows are
//! inputs with pull-downs, reading high through the switch diode.

use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pin, Pull};
use embassy_nrf::Peripheral;
use embassy_time::Delay;

use keymatrix_usb::config::{COLUMN_COUNT, COLUMN_SETTLE_US, ROW_COUNT};
use keymatrix_usb::matrix::pins::{PinColumns, PinRows};
use keymatrix_usb::matrix::Matrix;

pub type BoardMatrix = Matrix<
    PinColumns<Output<'static>, COLUMN_COUNT>,
    PinRows<Input<'static>, ROW_COUNT>,
    Delay,
>;

pub fn column(pin: impl Peripheral<P = impl Pin> + 'static) -> Output<'static> {
    Output::new(pin, Level::Low, OutputDrive::Standard)
}

pub fn row(pin: impl Peripheral<P = impl Pin> + 'static) -> Input<'static> {
    Input::new(pin, Pull::Down)
}

pub fn matrix(
    columns: [Output<'static>; COLUMN_COUNT],
    rows: [Input<'static>; ROW_COUNT],
) -> BoardMatrix {
    Matrix::new(
        PinColumns::new(columns),
        PinRows::new(rows),
        Delay,
        COLUMN_SETTLE_US,
    )
}
