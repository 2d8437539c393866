use crate::error::{PanelError, Result};

/// Number of columns in every panel row.
pub const COLUMNS: usize = 9;
/// Largest number of rows a panel may have.
pub const MAX_ROWS: usize = 6;

/// Validated panel dimensions: `rows` in `1..=6`, always 9 columns wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelSize {
    rows: u8,
}

impl PanelSize {
    pub fn new(rows: i64) -> Result<Self> {
        if !(1..=MAX_ROWS as i64).contains(&rows) {
            return Err(PanelError::InvalidRows(rows));
        }
        Ok(Self { rows: rows as u8 })
    }

    pub const fn rows(&self) -> usize {
        self.rows as usize
    }

    /// Total number of addressable slots.
    pub const fn slots(&self) -> usize {
        self.rows as usize * COLUMNS
    }

    /// Validate a raw slot index against this size.
    pub fn check(&self, index: i64) -> Result<usize> {
        if index < 0 || index >= self.slots() as i64 {
            return Err(PanelError::OutOfRange {
                index,
                size: self.slots(),
            });
        }
        Ok(index as usize)
    }

    /// Resolve a row/column pair into a slot index.
    ///
    /// The address is `row * column - 1`, which is the contract of the
    /// row/column entry points. It is not row-major: `(2, 3)` and `(3, 2)`
    /// both land on slot 5, and `(1, 9)` is the last slot of the first row
    /// only by coincidence of the product.
    pub fn slot_at(&self, row: i64, column: i64) -> Result<usize> {
        let index = row.saturating_mul(column).saturating_sub(1);
        self.check(index)
    }
}

/// Slot offset of the first cell on a 1-based line.
pub fn line_offset(line: i64) -> i64 {
    line.saturating_sub(1).saturating_mul(COLUMNS as i64)
}
