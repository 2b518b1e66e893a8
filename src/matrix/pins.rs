//! Matrix lines on plain `embedded-hal` digital pins.
//!
//! Columns are driven high one at a time and rows read high through their
//! diodes when a switch is closed. Boards wired the other way round (rows
//! pulled up, columns pulled low) use the `active_low` constructors.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use super::{ColumnDriver, RowSensor};

/// Column drive lines, one output pin per column.
pub struct PinColumns<P, const N: usize> {
    pins: [P; N],
    active: PinState,
}

impl<P, const N: usize> PinColumns<P, N>
where
    P: OutputPin<Error = Infallible>,
{
    /// Columns asserted by driving them high. Every pin is released first.
    pub fn new(pins: [P; N]) -> Self {
        Self::with_level(pins, PinState::High)
    }

    pub fn active_low(pins: [P; N]) -> Self {
        Self::with_level(pins, PinState::Low)
    }

    fn with_level(pins: [P; N], active: PinState) -> Self {
        let mut this = Self { pins, active };
        for col in 0..N {
            this.release_column(col);
        }
        this
    }
}

impl<P, const N: usize> ColumnDriver for PinColumns<P, N>
where
    P: OutputPin<Error = Infallible>,
{
    fn column_count(&self) -> usize {
        N
    }

    fn drive_column(&mut self, col: usize) {
        match self.pins[col].set_state(self.active) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn release_column(&mut self, col: usize) {
        match self.pins[col].set_state(!self.active) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}

/// Row sense lines, one input pin per row; at most 8.
pub struct PinRows<P, const N: usize> {
    pins: [P; N],
    closed: PinState,
}

impl<P, const N: usize> PinRows<P, N>
where
    P: InputPin<Error = Infallible>,
{
    const FITS: () = assert!(N <= 8, "rows are sampled into a u8");

    /// Rows that read high when a switch is closed.
    pub fn new(pins: [P; N]) -> Self {
        let () = Self::FITS;
        Self {
            pins,
            closed: PinState::High,
        }
    }

    pub fn active_low(pins: [P; N]) -> Self {
        let () = Self::FITS;
        Self {
            pins,
            closed: PinState::Low,
        }
    }
}

impl<P, const N: usize> RowSensor for PinRows<P, N>
where
    P: InputPin<Error = Infallible>,
{
    fn read_rows(&mut self) -> u8 {
        let closed_high = self.closed == PinState::High;
        self.pins
            .iter_mut()
            .enumerate()
            .fold(0, |bits, (row, pin)| {
                let high = match pin.is_high() {
                    Ok(high) => high,
                    Err(never) => match never {},
                };
                if high == closed_high {
                    bits | (1 << row)
                } else {
                    bits
                }
            })
    }
}
