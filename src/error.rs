use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type covering the failure cases of loading, consolidating and
/// exporting a ledger workbook.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the snapshot or the settings file cannot be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a workbook does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a cell could not be converted and the active handler
    /// asked to abort.
    #[error("cannot convert cell {cell} on sheet '{sheet}': {message}")]
    CellConversion {
        sheet: String,
        cell: String,
        message: String,
    },

    /// Raised when a named row carries no parseable price at all.
    #[error("row {row} ('{name}') on sheet '{sheet}' has no parseable price value")]
    NoPriceValues {
        sheet: String,
        row: u32,
        name: String,
    },

    /// Raised when a row without any date reaches the exporter.
    #[error("row #{sequence} ('{name}') has no date and cannot be placed in a month sheet")]
    UndatedRow { name: String, sequence: usize },

    /// Raised when the settings file describes an unusable layout.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
