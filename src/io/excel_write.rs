use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, info};

use crate::error::Result;
use crate::export::{MonthSheet, OutputCell, OutputWorkbook};
use crate::normalize::dates::date_to_excel_serial;
use crate::settings::OutputLayout;

/// Writes the month sheets to the given path.
pub fn write_workbook(
    path: &Path,
    workbook: &OutputWorkbook,
    layout: &OutputLayout,
) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let date_format = Format::new().set_num_format(&layout.date_format);

    for sheet in &workbook.sheets {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &date_format)?;

        for (&column, &width) in &layout.column_widths {
            worksheet.set_column_width(column, width)?;
        }
        debug!(sheet = %sheet.name, rows = sheet.row_count, "worksheet written");
    }

    if workbook.sheets.is_empty() {
        workbook_writer.add_worksheet();
    }

    workbook_writer.save(path)?;
    info!(
        path = %path.display(),
        sheets = ?workbook.sheet_names(),
        "output workbook saved"
    );
    Ok(())
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &MonthSheet,
    date_format: &Format,
) -> Result<()> {
    for (&(row, col), cell) in &sheet.cells {
        match cell {
            OutputCell::Text(value) => {
                worksheet.write_string(row, col, value)?;
            }
            OutputCell::Number(value) => {
                worksheet.write_number(row, col, *value)?;
            }
            OutputCell::Bool(value) => {
                worksheet.write_boolean(row, col, *value)?;
            }
            OutputCell::Date(date) => {
                worksheet.write_number_with_format(
                    row,
                    col,
                    date_to_excel_serial(*date),
                    date_format,
                )?;
            }
        }
    }
    Ok(())
}
