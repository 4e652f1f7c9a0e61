use std::fmt::{Debug, Formatter};
use std::hint;
use std::time::{Duration, Instant};
use log::trace;
use crate::{GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriveMode, GpioResult};
use crate::keypad::{KeyCode, Keypad};

/// Number of column (drive) lines in the front panel matrix.
pub const COLS: usize = 4;
/// Number of row (sense) lines in the front panel matrix.
pub const ROWS: usize = 3;

/// The `GpioKeypad` struct represents the front panel key matrix, with 4 driven columns
/// and 3 sensed rows.
///
/// Both buses are expected to be configured active-low (see [GpioKeypad::configure]), so writing
/// `true` to a column pulls it low and a row reads `true` while a closed key connects it to the
/// selected column.
pub struct GpioKeypad<'a> {
    cols: &'a dyn GpioBusOutput<COLS>,
    rows: &'a dyn GpioBusInput<ROWS>,
    settle_time: Duration,
}

impl Debug for GpioKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({:?}, {:?})", self.cols, self.rows)
    }
}

impl <'a> GpioKeypad<'a> {
    /// How long a freshly selected column is given before the rows are sampled.
    pub const SETTLE_TIME: Duration = Duration::from_micros(100);

    /// Key at every (column, row) intersection. Rows are listed in priority order.
    const KEYS: [[Option<KeyCode>; ROWS]; COLS] = [
        [Some(KeyCode::CH1_UP), Some(KeyCode::CH3_UP), None],
        [Some(KeyCode::CH1_DN), Some(KeyCode::CH3_DN), Some(KeyCode::SEL)],
        [Some(KeyCode::CH2_UP), Some(KeyCode::CH4_UP), Some(KeyCode::OK)],
        [Some(KeyCode::CH2_DN), Some(KeyCode::CH4_DN), Some(KeyCode::CANCEL)],
    ];

    /// Columns selected while the matrix is not being scanned.
    ///
    /// Every column is pulled low, so pressing any key drags its row down and fires the row's
    /// falling-edge interrupt.
    const REST_COLS: u8 = (1 << COLS) - 1;

    /// Applies the electrical configuration the matrix needs: open-drain, active-low columns and
    /// pulled-up, active-low rows.
    pub fn configure(cols: &mut dyn GpioBus<COLS>, rows: &mut dyn GpioBus<ROWS>) -> GpioResult<()> {
        cols.set_drive_mode(GpioDriveMode::OpenDrain)?;
        cols.set_active_level(GpioActiveLevel::Low)?;
        rows.set_bias(GpioBias::PullUp)?;
        rows.set_active_level(GpioActiveLevel::Low)?;
        Ok(())
    }

    /// Creates a new `GpioKeypad` instance over the column outputs and the row inputs.
    pub fn new(cols: &'a dyn GpioBusOutput<COLS>, rows: &'a dyn GpioBusInput<ROWS>) -> Self {
        GpioKeypad { cols, rows, settle_time: Self::SETTLE_TIME }
    }

    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    /// Gets the key wired at the given column and row, if there is one.
    pub fn key_at(col: usize, row: usize) -> Option<KeyCode> {
        Self::KEYS.get(col)?.get(row).copied().flatten()
    }

    /// Returns the columns to their rest state.
    pub fn rest(&self) -> GpioResult<()> {
        self.cols.write_bits(Self::REST_COLS)
    }

    /// Busy-waits for the column lines to settle.
    fn settle(&self) {
        let start = Instant::now();
        while start.elapsed() < self.settle_time {
            hint::spin_loop();
        }
    }

    fn scan_columns(&self) -> GpioResult<Option<KeyCode>> {
        for col in 0..COLS {
            // Walk a single selected column across the matrix.
            self.cols.write_bits(1 << col)?;
            self.settle();

            let rows = self.rows.read_bits()?;
            if rows != 0 {
                trace!("Matrix column {} reads rows {:03b}", col, rows);
                // Only one key is supported; the first asserted row decides.
                let row = rows.trailing_zeros() as usize;
                return Ok(Self::key_at(col, row));
            }
        }

        Ok(None)
    }
}

impl Keypad for GpioKeypad<'_> {
    fn scan(&self) -> GpioResult<Option<KeyCode>> {
        let result = self.scan_columns();
        self.rest()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioDriver;
    use crate::sim::SimGpioDriver;

    const COL_PINS: [usize; COLS] = [8, 9, 10, 11];
    const ROW_PINS: [usize; ROWS] = [12, 13, 14];

    fn with_keypad(driver: &SimGpioDriver, f: impl FnOnce(&GpioKeypad)) {
        let mut cols = driver.get_pin_bus(COL_PINS).unwrap();
        let mut rows = driver.get_pin_bus(ROW_PINS).unwrap();
        GpioKeypad::configure(&mut *cols, &mut *rows).unwrap();
        let cols_out = cols.as_output().unwrap();
        let rows_in = rows.as_input().unwrap();
        let keypad = GpioKeypad::new(&*cols_out, &*rows_in).with_settle_time(Duration::ZERO);
        f(&keypad);
    }

    #[test]
    fn nothing_pressed_scans_none() {
        let driver = SimGpioDriver::new(16);
        with_keypad(&driver, |keypad| {
            assert_eq!(keypad.scan().unwrap(), None);
        });
    }

    #[test]
    fn each_contact_maps_to_its_key() {
        let driver = SimGpioDriver::new(16);
        with_keypad(&driver, |keypad| {
            for col in 0..COLS {
                for row in 0..ROWS {
                    driver.close_contact(COL_PINS[col], ROW_PINS[row]);
                    assert_eq!(
                        keypad.scan().unwrap(),
                        GpioKeypad::key_at(col, row),
                        "col {col} row {row}",
                    );
                    driver.open_contact(COL_PINS[col], ROW_PINS[row]);
                }
            }
        });
        assert_eq!(GpioKeypad::key_at(1, 2), Some(KeyCode::SEL));
        assert_eq!(GpioKeypad::key_at(3, 2), Some(KeyCode::CANCEL));
        assert_eq!(GpioKeypad::key_at(0, 2), None);
    }

    #[test]
    fn first_column_wins() {
        let driver = SimGpioDriver::new(16);
        with_keypad(&driver, |keypad| {
            driver.close_contact(COL_PINS[2], ROW_PINS[2]);
            driver.close_contact(COL_PINS[0], ROW_PINS[1]);
            assert_eq!(keypad.scan().unwrap(), Some(KeyCode::CH3_UP));
        });
    }

    #[test]
    fn lower_row_wins_within_a_column() {
        let driver = SimGpioDriver::new(16);
        with_keypad(&driver, |keypad| {
            driver.close_contact(COL_PINS[1], ROW_PINS[2]);
            driver.close_contact(COL_PINS[1], ROW_PINS[0]);
            assert_eq!(keypad.scan().unwrap(), Some(KeyCode::CH1_DN));
        });
    }

    #[test]
    fn columns_rest_pulled_low_after_scan() {
        let driver = SimGpioDriver::new(16);
        with_keypad(&driver, |keypad| {
            keypad.scan().unwrap();
            for pin in COL_PINS {
                assert_eq!(driver.output(pin), Some(false));
            }

            // A key held at rest pulls its row low, which is what raises the interrupt.
            driver.close_contact(COL_PINS[3], ROW_PINS[0]);
            assert_eq!(keypad.scan().unwrap(), Some(KeyCode::CH2_DN));
            assert!(!driver.level(ROW_PINS[0]).unwrap());
            assert!(driver.level(ROW_PINS[1]).unwrap());
        });
    }
}
