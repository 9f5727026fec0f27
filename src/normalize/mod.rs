//! Stateless helpers that harmonise the loosely typed cells of hand-kept
//! worksheets: decimal separators, textual dates, Excel serials and the
//! month encoded in a worksheet name.

pub mod dates;
pub mod decimal;
