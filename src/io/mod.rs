//! Adapters over the spreadsheet libraries and the snapshot file.

pub mod excel_read;
pub mod excel_write;
pub mod snapshot;
pub mod template;
