//! Error types for dupmark-core

use thiserror::Error;

use crate::value::CellValue;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dupmark-core
#[derive(Debug, Error)]
pub enum Error {
    /// A value met while planning annotations was never indexed.
    ///
    /// The index was built over a different file set or column than the one
    /// being annotated.
    #[error("value {value:?} in row {} is missing from the frequency index", row + 1)]
    UnindexedValue {
        /// Zero-based row of the offending cell
        row: u32,
        /// The value that was looked up
        value: CellValue,
    },

    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Color that is not a 6 or 8 digit hex string
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}
