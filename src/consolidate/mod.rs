//! Folds the dated source tables into one [`MasterTable`].
//!
//! Each sheet is walked top to bottom. Blank date cells inherit the last date
//! seen on the same sheet, explicit dates typed with the wrong year are moved
//! into the sheet's year (except on December sheets, where entries legitimately
//! spill into January), rows without a name are dropped, and a run of blank
//! names marks the end of the sheet's data.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::model::{
    CellValue, MasterRow, MasterTable, PRICE_COLUMN_COUNT, Prices, SheetTable,
};
use crate::normalize::dates::{parse_cell_date, with_year_clamped};
use crate::normalize::decimal::{decimal_from_f64, parse_decimal};
use crate::settings::SourceLayout;

/// Per-sheet walking state.
#[derive(Debug, Default)]
struct SheetCursor {
    last_known_date: Option<NaiveDate>,
    consecutive_blank_names: usize,
}

/// Consolidates every table, in order, into a fresh master table.
pub fn consolidate(tables: &[SheetTable], layout: &SourceLayout) -> Result<MasterTable> {
    let mut master = MasterTable::new();
    for table in tables {
        consolidate_sheet(table, layout, &mut master)?;
    }
    info!(
        sheets = tables.len(),
        rows = master.len(),
        "consolidated source worksheets"
    );
    Ok(master)
}

/// Appends the qualifying rows of one table to `master`.
pub fn consolidate_sheet(
    table: &SheetTable,
    layout: &SourceLayout,
    master: &mut MasterTable,
) -> Result<()> {
    info!(sheet = %table.name, "consolidating worksheet");
    let price_columns = table.price_columns(&layout.price_columns);
    let mut cursor = SheetCursor::default();
    let before = master.len();

    for row_idx in 0..table.rows.len() {
        let date = resolve_date(table, row_idx, layout, &mut cursor);

        let name = table.cell(row_idx, layout.name_column);
        if name.is_blank() {
            cursor.consecutive_blank_names += 1;
            if cursor.consecutive_blank_names > layout.max_blank_names {
                debug!(
                    sheet = %table.name,
                    row = table.sheet_row_number(row_idx),
                    "stopping after a run of rows without a name"
                );
                break;
            }
            continue;
        }

        cursor.consecutive_blank_names = 0;
        let name = name.to_text().trim().to_string();
        let prices = copy_prices(table, row_idx, &price_columns, &name)?;
        let row = MasterRow {
            date,
            name,
            prices,
            source_sheet: table.name.clone(),
        };
        debug!(
            sheet = %table.name,
            row = table.sheet_row_number(row_idx),
            name = %row.name,
            prices = row.price_count(),
            "row copied"
        );
        master.push(row);
    }

    debug!(sheet = %table.name, rows = master.len() - before, "rows copied");
    Ok(())
}

/// Fills or corrects the date of a row and advances the cursor.
fn resolve_date(
    table: &SheetTable,
    row_idx: usize,
    layout: &SourceLayout,
    cursor: &mut SheetCursor,
) -> Option<NaiveDate> {
    let cell = table.cell(row_idx, layout.date_column);
    if cell.is_blank() {
        return cursor.last_known_date;
    }

    let Some(parsed) = parse_cell_date(cell, &layout.date_formats) else {
        warn!(
            sheet = %table.name,
            cell = %table.cell_reference(row_idx, layout.date_column),
            value = %cell.to_text(),
            "unreadable date, keeping the previous one"
        );
        return cursor.last_known_date;
    };

    let date = if layout.correct_year_mistakes {
        correct_year(parsed, table)
    } else {
        parsed
    };
    cursor.last_known_date = Some(date);
    Some(date)
}

/// Moves a date into the sheet's year unless the sheet covers December.
fn correct_year(date: NaiveDate, table: &SheetTable) -> NaiveDate {
    let period = table.period;
    if date.year() == period.year || period.is_december() {
        return date;
    }
    match with_year_clamped(date, period.year) {
        Some(corrected) => {
            debug!(sheet = %table.name, %date, %corrected, "corrected date year");
            corrected
        }
        None => date,
    }
}

/// Parses the price cells of a row. Individual bad cells are skipped; a row
/// without a single usable price is rejected.
fn copy_prices(
    table: &SheetTable,
    row_idx: usize,
    price_columns: &[(usize, usize)],
    name: &str,
) -> Result<Prices> {
    let mut prices: Prices = [None; PRICE_COLUMN_COUNT];

    for &(column, slot) in price_columns {
        let cell = table.cell(row_idx, column);
        if cell.is_blank() {
            continue;
        }
        let parsed = match cell {
            CellValue::Number(value) => decimal_from_f64(*value),
            CellValue::Text(text) => parse_decimal(text),
            CellValue::Empty | CellValue::Date(_) => None,
        };
        match parsed {
            Some(value) => prices[slot] = Some(value),
            None => warn!(
                sheet = %table.name,
                cell = %table.cell_reference(row_idx, column),
                value = %cell.to_text(),
                "invalid price, skipping cell"
            ),
        }
    }

    if prices.iter().all(Option::is_none) {
        return Err(LedgerError::NoPriceValues {
            sheet: table.name.clone(),
            row: table.sheet_row_number(row_idx),
            name: name.to_string(),
        });
    }
    Ok(prices)
}
