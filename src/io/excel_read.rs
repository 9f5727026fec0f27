use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::model::{CellValue, SheetPeriod, SheetTable};
use crate::normalize::dates::{excel_serial_to_date, parse_sheet_period};
use crate::normalize::decimal::repair_separator;
use crate::settings::SourceLayout;

/// What the loader should do with a cell it cannot convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPolicy {
    /// Log the cell and load it as empty.
    #[default]
    Skip,
    /// Fail the whole load.
    Abort,
}

/// Decision returned by a [`ConversionHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionAction {
    Continue,
    Abort,
}

/// A cell whose value could not be turned into a [`CellValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct CellConversionError {
    /// Table name of the sheet, e.g. `03/2024`.
    pub sheet: String,
    /// A1 reference of the offending cell.
    pub cell: String,
    pub message: String,
}

/// Callback consulted for every cell that fails to convert.
pub trait ConversionHandler {
    fn on_conversion_error(&mut self, error: &CellConversionError) -> ConversionAction;
}

impl ConversionHandler for ConversionPolicy {
    fn on_conversion_error(&mut self, error: &CellConversionError) -> ConversionAction {
        match self {
            ConversionPolicy::Skip => {
                warn!(
                    sheet = %error.sheet,
                    cell = %error.cell,
                    reason = %error.message,
                    "error in cell, loading it as empty"
                );
                ConversionAction::Continue
            }
            ConversionPolicy::Abort => ConversionAction::Abort,
        }
    }
}

impl<F> ConversionHandler for F
where
    F: FnMut(&CellConversionError) -> ConversionAction,
{
    fn on_conversion_error(&mut self, error: &CellConversionError) -> ConversionAction {
        self(error)
    }
}

/// Loads every worksheet whose name encodes a month. Other worksheets are
/// ignored.
pub fn read_sheet_tables(
    path: &Path,
    layout: &SourceLayout,
    handler: &mut dyn ConversionHandler,
) -> Result<Vec<SheetTable>> {
    info!(path = %path.display(), "loading source workbook");
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let mut tables = Vec::new();
    for sheet_name in sheet_names {
        let Some(period) = parse_sheet_period(&sheet_name, &layout.sheet_name_formats) else {
            debug!(sheet = %sheet_name, "skipping worksheet without a month name");
            continue;
        };

        let range = read_required_sheet(&mut workbook, &sheet_name)?;
        let table = table_from_range(&sheet_name, period, &range, layout, handler)?;
        info!(
            sheet = %table.name,
            source = %table.source_name,
            rows = table.rows.len(),
            "loaded worksheet"
        );
        tables.push(table);
    }

    Ok(tables)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| LedgerError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(LedgerError::from)?;
    Ok(range)
}

/// Turns the used range of one worksheet into a [`SheetTable`]: the first row
/// is the header, the remaining rows are data.
pub fn table_from_range(
    source_name: &str,
    period: SheetPeriod,
    range: &Range<DataType>,
    layout: &SourceLayout,
    handler: &mut dyn ConversionHandler,
) -> Result<SheetTable> {
    let mut table = SheetTable::new(source_name, period);
    table.origin = range.start().unwrap_or((0, 0));

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(table);
    };
    table.headers = header.iter().map(header_text).collect();

    for (row_idx, row) in rows.enumerate() {
        let mut cells = Vec::with_capacity(row.len());
        for (col_idx, cell) in row.iter().enumerate() {
            let value = match convert_cell(cell) {
                Ok(value) => value,
                Err(message) => {
                    let error = CellConversionError {
                        sheet: table.name.clone(),
                        cell: table.cell_reference(row_idx, col_idx),
                        message,
                    };
                    match handler.on_conversion_error(&error) {
                        ConversionAction::Continue => CellValue::Empty,
                        ConversionAction::Abort => {
                            return Err(LedgerError::CellConversion {
                                sheet: error.sheet,
                                cell: error.cell,
                                message: error.message,
                            });
                        }
                    }
                }
            };
            cells.push(value);
        }
        table.rows.push(cells);
    }

    repair_decimal_columns(&mut table, &layout.price_columns);
    Ok(table)
}

/// Rewrites every price column that is not purely numeric into text with '.'
/// as the decimal separator. Numeric columns are left untouched.
pub fn repair_decimal_columns<S: AsRef<str>>(table: &mut SheetTable, price_names: &[S]) {
    for (column, _slot) in table.price_columns(price_names) {
        let numeric = table.rows.iter().all(|row| {
            row.get(column)
                .is_none_or(|cell| cell.is_blank() || matches!(cell, CellValue::Number(_)))
        });
        if numeric {
            continue;
        }

        debug!(sheet = %table.name, column, "repairing decimal separators");
        for row in &mut table.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = if cell.is_blank() {
                    CellValue::Empty
                } else {
                    CellValue::Text(repair_separator(&cell.to_text()))
                };
            }
        }
    }
}

fn convert_cell(cell: &DataType) -> std::result::Result<CellValue, String> {
    match cell {
        DataType::Empty => Ok(CellValue::Empty),
        DataType::String(value) => Ok(CellValue::Text(value.clone())),
        DataType::Float(value) => Ok(CellValue::Number(*value)),
        DataType::Int(value) => Ok(CellValue::Number(*value as f64)),
        DataType::Bool(value) => Ok(CellValue::Text(value.to_string())),
        DataType::DateTime(serial) => excel_serial_to_date(*serial)
            .map(CellValue::Date)
            .ok_or_else(|| format!("date serial {serial} is outside the calendar")),
        DataType::DateTimeIso(text) => Ok(text
            .parse::<NaiveDateTime>()
            .map(|value| CellValue::Date(value.date()))
            .unwrap_or_else(|_| CellValue::Text(text.clone()))),
        DataType::Error(error) => Err(format!("cell holds error value {error:?}")),
        other => Ok(CellValue::Text(other.to_string())),
    }
}

fn header_text(cell: &DataType) -> String {
    match cell {
        DataType::String(value) => value.trim().to_string(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    fn sample_range() -> Range<DataType> {
        let mut range = Range::new((0, 0), (3, 4));
        range.set_value((0, 0), DataType::String("Date".into()));
        range.set_value((0, 1), DataType::String("Name".into()));
        range.set_value((0, 2), DataType::String("Col1".into()));
        range.set_value((0, 3), DataType::String("Col2".into()));
        range.set_value((0, 4), DataType::String("Memo".into()));

        range.set_value((1, 0), DataType::DateTime(45366.0));
        range.set_value((1, 1), DataType::String("Widget".into()));
        range.set_value((1, 2), DataType::String("1,5".into()));
        range.set_value((1, 3), DataType::Float(2.0));
        range.set_value((1, 4), DataType::String("a,b".into()));

        range.set_value((2, 1), DataType::String("Gadget".into()));
        range.set_value((2, 2), DataType::Float(3.25));
        range.set_value((2, 3), DataType::Error(CellErrorType::NA));

        range.set_value((3, 1), DataType::String("Gizmo".into()));
        range
    }

    fn march() -> SheetPeriod {
        SheetPeriod::new(2024, 3).unwrap()
    }

    #[test]
    fn loads_headers_and_rows() {
        let layout = SourceLayout::default();
        let mut policy = ConversionPolicy::Skip;
        let table = table_from_range("03.2024", march(), &sample_range(), &layout, &mut policy)
            .expect("table loaded");

        assert_eq!(table.name, "03/2024");
        assert_eq!(table.source_name, "03.2024");
        assert_eq!(table.headers, vec!["Date", "Name", "Col1", "Col2", "Memo"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.cell(0, 0),
            &CellValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert_eq!(table.cell(0, 1), &CellValue::Text("Widget".into()));
    }

    #[test]
    fn mixed_price_columns_are_repaired_as_text() {
        let layout = SourceLayout::default();
        let mut policy = ConversionPolicy::Skip;
        let table = table_from_range("03.2024", march(), &sample_range(), &layout, &mut policy)
            .expect("table loaded");

        assert_eq!(table.cell(0, 2), &CellValue::Text("1.5".into()));
        assert_eq!(table.cell(1, 2), &CellValue::Text("3.25".into()));
        assert_eq!(table.cell(2, 2), &CellValue::Empty);
        // Col2 only holds numbers once the error cell is dropped.
        assert_eq!(table.cell(0, 3), &CellValue::Number(2.0));
        // Non-price columns keep their commas.
        assert_eq!(table.cell(0, 4), &CellValue::Text("a,b".into()));
    }

    #[test]
    fn conversion_errors_reach_the_handler() {
        let layout = SourceLayout::default();
        let mut seen = Vec::new();
        let mut collect = |error: &CellConversionError| {
            seen.push(error.clone());
            ConversionAction::Continue
        };
        let table = table_from_range("03.2024", march(), &sample_range(), &layout, &mut collect)
            .expect("table loaded");

        assert_eq!(table.cell(1, 3), &CellValue::Empty);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].sheet, "03/2024");
        assert_eq!(seen[0].cell, "D3");
    }

    #[test]
    fn abort_policy_fails_the_load() {
        let layout = SourceLayout::default();
        let mut policy = ConversionPolicy::Abort;
        let error = table_from_range("03.2024", march(), &sample_range(), &layout, &mut policy)
            .unwrap_err();

        assert!(matches!(
            error,
            LedgerError::CellConversion { ref cell, .. } if cell == "D3"
        ));
    }

    #[test]
    fn iso_date_time_cells_load_as_dates() {
        let layout = SourceLayout::default();
        let mut policy = ConversionPolicy::Skip;
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), DataType::String("Date".into()));
        range.set_value((0, 1), DataType::String("Name".into()));
        range.set_value((0, 2), DataType::String("Col1".into()));
        range.set_value((1, 0), DataType::DateTimeIso("2024-03-15T00:00:00".into()));
        range.set_value((1, 1), DataType::String("Widget".into()));
        range.set_value((2, 0), DataType::DateTimeIso("2024-03-16".into()));
        range.set_value((2, 1), DataType::String("Gadget".into()));

        let table = table_from_range("03.2024", march(), &range, &layout, &mut policy)
            .expect("table loaded");

        assert_eq!(
            table.cell(0, 0),
            &CellValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        // Date-only ISO text is left for the textual date formats.
        assert_eq!(table.cell(1, 0), &CellValue::Text("2024-03-16".into()));
    }

    #[test]
    fn empty_range_yields_empty_table() {
        let layout = SourceLayout::default();
        let mut policy = ConversionPolicy::Skip;
        let range: Range<DataType> = Range::empty();
        let table = table_from_range("03.2024", march(), &range, &layout, &mut policy)
            .expect("table loaded");

        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }
}
