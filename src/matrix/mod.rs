//! Key matrix scanner.
//!
//! One scan drives each column alone, waits for the lines to settle,
//! samples every row into a bitfield and releases the column before moving
//! on. The resulting [`MatrixSnapshot`] is raw: no debouncing, each cycle's
//! sample is authoritative. [`fold`] turns a snapshot into a full input
//! report through the keymap.

pub mod pins;

use embedded_hal::delay::DelayNs;

use crate::hid::{KeyboardReport, Keycode};

/// Column drive lines of the matrix.
pub trait ColumnDriver {
    fn column_count(&self) -> usize;

    /// Assert column `col`. Only ever called with every column released.
    fn drive_column(&mut self, col: usize);

    fn release_column(&mut self, col: usize);
}

/// Row sense lines of the matrix.
pub trait RowSensor {
    /// Sample every row: bit `j` set means the switch on row `j` of the
    /// driven column is closed.
    fn read_rows(&mut self) -> u8;
}

/// Static (column, row) to keycode table.
pub type Keymap<const C: usize, const R: usize> = [[Keycode; R]; C];

/// One scan's worth of row samples, one byte per column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixSnapshot<const C: usize> {
    columns: [u8; C],
}

impl<const C: usize> Default for MatrixSnapshot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: usize> MatrixSnapshot<C> {
    /// All switches open.
    pub const fn new() -> Self {
        Self { columns: [0; C] }
    }

    pub const fn from_columns(columns: [u8; C]) -> Self {
        Self { columns }
    }

    pub fn column(&self, col: usize) -> u8 {
        self.columns[col]
    }

    pub fn set_column(&mut self, col: usize, rows: u8) {
        self.columns[col] = rows;
    }

    pub fn is_closed(&self, col: usize, row: usize) -> bool {
        row < 8 && self.columns[col] & (1 << row) != 0
    }

    /// Close a single switch. Handy for building scenarios.
    ///
    /// Rows past 7 have no bit in a column sample and are ignored.
    pub fn close(&mut self, col: usize, row: usize) {
        if row < 8 {
            self.columns[col] |= 1 << row;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.columns.iter().all(|&c| c == 0)
    }
}

/// Matrix scanner over a set of column drivers and row sensors.
pub struct Matrix<COLS, ROWS, D> {
    cols: COLS,
    rows: ROWS,
    delay: D,
    settle_us: u32,
}

impl<COLS, ROWS, D> Matrix<COLS, ROWS, D>
where
    COLS: ColumnDriver,
    ROWS: RowSensor,
    D: DelayNs,
{
    pub fn new(cols: COLS, rows: ROWS, delay: D, settle_us: u32) -> Self {
        Self {
            cols,
            rows,
            delay,
            settle_us,
        }
    }

    /// Scan every column once.
    ///
    /// `C` must match the driver's column count; surplus snapshot columns
    /// stay open.
    pub fn scan<const C: usize>(&mut self) -> MatrixSnapshot<C> {
        debug_assert_eq!(self.cols.column_count(), C);

        let mut snapshot = MatrixSnapshot::new();
        let count = self.cols.column_count().min(C);
        for col in 0..count {
            self.cols.drive_column(col);
            self.delay.delay_us(self.settle_us);
            snapshot.set_column(col, self.rows.read_rows());
            self.cols.release_column(col);
        }
        snapshot
    }

    /// Give back the pins.
    pub fn release(self) -> (COLS, ROWS, D) {
        (self.cols, self.rows, self.delay)
    }
}

/// Build the input report for a snapshot.
///
/// The report is recomputed from scratch, so keycodes no cell maps to are
/// always zero. When two cells share a keycode the key reads pressed if
/// either switch is closed.
pub fn fold<const C: usize, const R: usize>(
    snapshot: &MatrixSnapshot<C>,
    keymap: &Keymap<C, R>,
) -> KeyboardReport {
    let mut report = KeyboardReport::empty();
    for (col, keys) in keymap.iter().enumerate() {
        for (row, &code) in keys.iter().enumerate() {
            if snapshot.is_closed(col, row) {
                report.press(code);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keycode::usage;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Op {
        Drive(usize),
        Release(usize),
        Settle(u32),
        Read,
    }

    /// Matrix wiring double that records every line operation. Reading the
    /// rows answers with the pattern for whichever column is currently
    /// driven, or 0 if none is.
    struct Recorder {
        log: Rc<RefCell<Vec<Op>>>,
        driven: Rc<Cell<Option<usize>>>,
        pattern: [u8; 3],
    }

    struct Cols(Recorder);
    struct Rows(Recorder);
    struct Delay(Recorder);

    impl ColumnDriver for Cols {
        fn column_count(&self) -> usize {
            3
        }
        fn drive_column(&mut self, col: usize) {
            assert_eq!(self.0.driven.get(), None, "two columns driven");
            self.0.driven.set(Some(col));
            self.0.log.borrow_mut().push(Op::Drive(col));
        }
        fn release_column(&mut self, col: usize) {
            assert_eq!(self.0.driven.get(), Some(col));
            self.0.driven.set(None);
            self.0.log.borrow_mut().push(Op::Release(col));
        }
    }

    impl RowSensor for Rows {
        fn read_rows(&mut self) -> u8 {
            self.0.log.borrow_mut().push(Op::Read);
            self.0.driven.get().map_or(0, |c| self.0.pattern[c])
        }
    }

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.log.borrow_mut().push(Op::Settle(ns / 1000));
        }
    }

    fn recorder_matrix(pattern: [u8; 3]) -> (Matrix<Cols, Rows, Delay>, Rc<RefCell<Vec<Op>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let driven = Rc::new(Cell::new(None));
        let mk = || Recorder {
            log: log.clone(),
            driven: driven.clone(),
            pattern,
        };
        (Matrix::new(Cols(mk()), Rows(mk()), Delay(mk()), 2), log)
    }

    #[test]
    fn scan_drives_one_column_at_a_time_in_order() {
        let (mut matrix, log) = recorder_matrix([0, 0, 0]);
        let _ = matrix.scan::<3>();

        let expected = [
            Op::Drive(0),
            Op::Settle(2),
            Op::Read,
            Op::Release(0),
            Op::Drive(1),
            Op::Settle(2),
            Op::Read,
            Op::Release(1),
            Op::Drive(2),
            Op::Settle(2),
            Op::Read,
            Op::Release(2),
        ];
        assert_eq!(log.borrow().as_slice(), &expected);
    }

    #[test]
    fn close_ignores_rows_without_a_bit() {
        let mut snapshot = MatrixSnapshot::<2>::new();
        snapshot.close(1, 8);
        snapshot.close(1, 200);
        assert!(snapshot.is_idle());
        assert!(!snapshot.is_closed(1, 8));

        snapshot.close(1, 7);
        assert_eq!(snapshot.column(1), 0b1000_0000);
    }

    #[test]
    fn scan_captures_rows_per_column() {
        let (mut matrix, _log) = recorder_matrix([0b00001, 0b00000, 0b10010]);
        let snapshot = matrix.scan::<3>();
        assert_eq!(snapshot, MatrixSnapshot::from_columns([0b00001, 0, 0b10010]));
        assert!(snapshot.is_closed(2, 1));
        assert!(snapshot.is_closed(2, 4));
        assert!(!snapshot.is_closed(1, 0));
    }

    const SMALL_MAP: Keymap<3, 2> = [
        [usage::A, usage::LEFT_SHIFT],
        [usage::B, usage::C],
        [usage::RIGHT_ALT, usage::A],
    ];

    #[test]
    fn fold_all_open_is_empty_report() {
        let report = fold(&MatrixSnapshot::<3>::new(), &SMALL_MAP);
        assert!(report.is_empty());
    }

    #[test]
    fn fold_sets_exactly_mapped_bits() {
        let mut snapshot = MatrixSnapshot::<3>::new();
        snapshot.close(0, 1);
        snapshot.close(1, 1);
        let report = fold(&snapshot, &SMALL_MAP);

        assert!(report.is_pressed(usage::LEFT_SHIFT));
        assert!(report.is_pressed(usage::C));
        assert_eq!(report.pressed_count(), 2);
    }

    #[test]
    fn fold_matches_cell_state_for_every_pattern() {
        // Exhaustive over all 2^6 switch patterns of the small map.
        for bits in 0u8..64 {
            let mut snapshot = MatrixSnapshot::<3>::new();
            for cell in 0..6 {
                if bits & (1 << cell) != 0 {
                    snapshot.close(cell / 2, cell % 2);
                }
            }
            let report = fold(&snapshot, &SMALL_MAP);

            for (col, keys) in SMALL_MAP.iter().enumerate() {
                for (row, &code) in keys.iter().enumerate() {
                    if snapshot.is_closed(col, row) {
                        assert!(report.is_pressed(code));
                    }
                }
            }
            // A is mapped twice: pressed iff either cell is closed.
            assert_eq!(
                report.is_pressed(usage::A),
                snapshot.is_closed(0, 0) || snapshot.is_closed(2, 1)
            );
            // Nothing outside the map ever appears.
            for code in report.pressed() {
                assert!(SMALL_MAP.iter().flatten().any(|&k| k == code));
            }
        }
    }

    #[test]
    fn fold_ignores_rows_beyond_keymap() {
        let snapshot = MatrixSnapshot::<3>::from_columns([0b1111_1100; 3]);
        assert!(fold(&snapshot, &SMALL_MAP).is_empty());
    }
}
