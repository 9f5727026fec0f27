//! Core library for the monthly-ledger command line application.
//!
//! The library folds a workbook of hand-kept, month-named worksheets into one
//! normalized ledger and re-emits it as one worksheet per month. Spreadsheet
//! adapters live under [`io`], the row and sheet types in [`model`], the cell
//! clean-up helpers in [`normalize`], the per-sheet state machine in
//! [`consolidate`], the month splitting in [`export`], and the stage
//! orchestration in [`pipeline`].

pub mod consolidate;
pub mod error;
pub mod export;
pub mod io;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod settings;

pub use error::{LedgerError, Result};
pub use settings::Settings;
