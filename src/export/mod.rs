use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::model::{MasterRow, MasterTable, SheetPeriod};
use crate::normalize::decimal::decimal_to_f64;
use crate::settings::OutputLayout;

/// A value placed into an output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

/// Sparse cell map keyed by zero-based (row, column).
pub type CellMap = BTreeMap<(u32, u16), OutputCell>;

/// Cells of the layout worksheet every month sheet starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateSheet {
    pub name: String,
    pub cells: CellMap,
}

impl TemplateSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: CellMap::new(),
        }
    }
}

/// One generated worksheet holding every row of a calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSheet {
    pub name: String,
    pub period: SheetPeriod,
    pub cells: CellMap,
    pub row_count: usize,
}

impl MonthSheet {
    /// Starts a month sheet as a copy of the template.
    pub fn from_template(period: SheetPeriod, template: &TemplateSheet) -> Self {
        Self {
            name: period.sheet_name(),
            period,
            cells: template.cells.clone(),
            row_count: 0,
        }
    }

    /// Writes the next ledger row below the previous one. Absent prices keep
    /// whatever the template holds in that cell.
    fn append(&mut self, date: NaiveDate, row: &MasterRow, layout: &OutputLayout) {
        let position = layout.first_row + self.row_count as u32;
        self.cells
            .insert((position, layout.date_column), OutputCell::Date(date));
        self.cells.insert(
            (position, layout.name_column),
            OutputCell::Text(row.name.clone()),
        );
        for (slot, price) in row.prices.iter().enumerate() {
            if let Some(price) = price {
                self.cells.insert(
                    (position, layout.price_column(slot)),
                    OutputCell::Number(decimal_to_f64(*price)),
                );
            }
        }
        self.row_count += 1;
    }
}

/// Everything the Excel writer needs to materialise the output workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputWorkbook {
    pub sheets: Vec<MonthSheet>,
}

impl OutputWorkbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

/// Orders master rows by date, ties broken by their consolidation sequence.
///
/// Every row must carry a date; the first undated row fails the export.
pub fn ordered_rows(master: &MasterTable) -> Result<Vec<(NaiveDate, usize, &MasterRow)>> {
    let mut ordered = master
        .iter()
        .enumerate()
        .map(|(sequence, row)| match row.date {
            Some(date) => Ok((date, sequence, row)),
            None => Err(LedgerError::UndatedRow {
                name: row.name.clone(),
                sequence,
            }),
        })
        .collect::<Result<Vec<_>>>()?;
    ordered.sort_by_key(|(date, sequence, _)| (*date, *sequence));
    Ok(ordered)
}

/// Splits the master table into month sheets cloned from `template`.
pub fn build_workbook(
    master: &MasterTable,
    template: &TemplateSheet,
    layout: &OutputLayout,
) -> Result<OutputWorkbook> {
    let mut workbook = OutputWorkbook::default();

    for (date, sequence, row) in ordered_rows(master)? {
        let period = SheetPeriod::of(date);
        let starts_month = workbook
            .sheets
            .last()
            .is_none_or(|sheet| sheet.period != period);
        if starts_month {
            info!(sheet = %period.sheet_name(), "creating month sheet");
            workbook
                .sheets
                .push(MonthSheet::from_template(period, template));
        }
        let Some(sheet) = workbook.sheets.last_mut() else {
            continue;
        };
        debug!(sheet = %sheet.name, sequence, name = %row.name, "placing row");
        sheet.append(date, row, layout);
    }

    Ok(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PRICE_COLUMN_COUNT;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn row(date: NaiveDate, name: &str, first_price: i64) -> MasterRow {
        let mut prices = [None; PRICE_COLUMN_COUNT];
        prices[0] = Some(Decimal::new(first_price, 0));
        MasterRow {
            date: Some(date),
            name: name.to_string(),
            prices,
            source_sheet: SheetPeriod::of(date).table_name(),
        }
    }

    fn template() -> TemplateSheet {
        let mut template = TemplateSheet::new("Layout");
        template
            .cells
            .insert((0, 0), OutputCell::Text("Date".into()));
        template
            .cells
            .insert((0, 1), OutputCell::Text("Name".into()));
        template.cells.insert((1, 5), OutputCell::Number(-1.0));
        template
    }

    fn names_in(sheet: &MonthSheet, layout: &OutputLayout) -> Vec<String> {
        (0..sheet.row_count)
            .filter_map(|offset| {
                let position = (layout.first_row + offset as u32, layout.name_column);
                match sheet.cells.get(&position) {
                    Some(OutputCell::Text(name)) => Some(name.clone()),
                    _ => None,
                }
            })
            .collect()
    }

    #[test]
    fn month_sheet_is_named_with_dash() {
        let master = MasterTable {
            rows: vec![row(ymd(2024, 3, 15), "Widget", 1)],
        };
        let workbook =
            build_workbook(&master, &template(), &OutputLayout::default()).expect("exported");

        assert_eq!(workbook.sheet_names(), vec!["03-2024"]);
    }

    #[test]
    fn one_sheet_per_month_in_calendar_order() {
        let mut master = MasterTable::new();
        for month in (1..=12).rev() {
            master.push(row(ymd(2024, month, 10), "Item", i64::from(month)));
            master.push(row(ymd(2024, month, 2), "Other", i64::from(month)));
        }
        let workbook =
            build_workbook(&master, &template(), &OutputLayout::default()).expect("exported");

        let expected: Vec<String> = (1..=12).map(|month| format!("{month:02}-2024")).collect();
        assert_eq!(workbook.sheet_names(), expected);
        assert!(workbook.sheets.iter().all(|sheet| sheet.row_count == 2));
    }

    #[test]
    fn same_day_rows_keep_insertion_order() {
        let layout = OutputLayout::default();
        let master = MasterTable {
            rows: vec![
                row(ymd(2024, 3, 20), "Late", 1),
                row(ymd(2024, 3, 5), "First", 2),
                row(ymd(2024, 3, 5), "Second", 3),
                row(ymd(2024, 4, 1), "April", 4),
                row(ymd(2024, 3, 5), "Third", 5),
            ],
        };
        let workbook = build_workbook(&master, &template(), &layout).expect("exported");

        assert_eq!(workbook.sheet_names(), vec!["03-2024", "04-2024"]);
        assert_eq!(
            names_in(&workbook.sheets[0], &layout),
            vec!["First", "Second", "Third", "Late"]
        );
        assert_eq!(names_in(&workbook.sheets[1], &layout), vec!["April"]);
    }

    #[test]
    fn boundaries_do_not_depend_on_order_across_dates() {
        let layout = OutputLayout::default();
        let rows = vec![
            row(ymd(2024, 1, 31), "A", 1),
            row(ymd(2024, 2, 1), "B", 2),
            row(ymd(2024, 2, 1), "C", 3),
            row(ymd(2024, 3, 3), "D", 4),
        ];
        let mut shuffled = rows.clone();
        shuffled.swap(0, 3);

        let forward = build_workbook(&MasterTable { rows }, &template(), &layout)
            .expect("exported");
        let backward = build_workbook(&MasterTable { rows: shuffled }, &template(), &layout)
            .expect("exported");

        assert_eq!(forward, backward);
    }

    #[test]
    fn swapping_same_day_rows_keeps_sheet_boundaries() {
        let layout = OutputLayout::default();
        let rows = vec![
            row(ymd(2024, 1, 31), "A", 1),
            row(ymd(2024, 1, 31), "B", 2),
            row(ymd(2024, 2, 1), "C", 3),
            row(ymd(2024, 2, 1), "D", 4),
            row(ymd(2024, 3, 3), "E", 5),
        ];
        let mut swapped = rows.clone();
        swapped.swap(0, 1);
        swapped.swap(2, 3);

        let original = build_workbook(&MasterTable { rows }, &template(), &layout)
            .expect("exported");
        let reordered = build_workbook(&MasterTable { rows: swapped }, &template(), &layout)
            .expect("exported");

        let counts = |workbook: &OutputWorkbook| -> Vec<usize> {
            workbook.sheets.iter().map(|sheet| sheet.row_count).collect()
        };
        assert_eq!(original.sheet_names(), reordered.sheet_names());
        assert_eq!(counts(&original), counts(&reordered));
        assert_eq!(counts(&original), vec![2, 2, 1]);
        // Ties follow insertion order, so only the order within a day changes.
        assert_eq!(names_in(&reordered.sheets[0], &layout), vec!["B", "A"]);
        assert_eq!(names_in(&reordered.sheets[1], &layout), vec!["D", "C"]);
    }

    #[test]
    fn same_month_of_different_years_gets_separate_sheets() {
        let master = MasterTable {
            rows: vec![
                row(ymd(2024, 3, 1), "New", 1),
                row(ymd(2023, 3, 1), "Old", 2),
            ],
        };
        let workbook =
            build_workbook(&master, &template(), &OutputLayout::default()).expect("exported");

        assert_eq!(workbook.sheet_names(), vec!["03-2023", "03-2024"]);
    }

    #[test]
    fn rows_fill_fixed_cells_and_absent_prices_keep_template() {
        let layout = OutputLayout::default();
        let mut widget = row(ymd(2024, 3, 15), "Widget", 0);
        widget.prices[0] = Some(Decimal::new(15, 1));
        widget.prices[8] = Some(Decimal::new(7, 0));
        let workbook = build_workbook(
            &MasterTable { rows: vec![widget] },
            &template(),
            &layout,
        )
        .expect("exported");

        let cells = &workbook.sheets[0].cells;
        assert_eq!(cells.get(&(0, 0)), Some(&OutputCell::Text("Date".into())));
        assert_eq!(cells.get(&(1, 0)), Some(&OutputCell::Date(ymd(2024, 3, 15))));
        assert_eq!(cells.get(&(1, 1)), Some(&OutputCell::Text("Widget".into())));
        assert_eq!(cells.get(&(1, 2)), None);
        assert_eq!(cells.get(&(1, 3)), Some(&OutputCell::Number(1.5)));
        assert_eq!(cells.get(&(1, 4)), None);
        assert_eq!(cells.get(&(1, 5)), Some(&OutputCell::Number(-1.0)));
        assert_eq!(cells.get(&(1, 11)), Some(&OutputCell::Number(7.0)));
    }

    #[test]
    fn undated_row_fails_the_export() {
        let mut undated = row(ymd(2024, 3, 15), "Mystery", 1);
        undated.date = None;
        let master = MasterTable {
            rows: vec![row(ymd(2024, 3, 1), "Known", 1), undated],
        };

        let error = build_workbook(&master, &template(), &OutputLayout::default()).unwrap_err();
        assert!(matches!(
            error,
            LedgerError::UndatedRow { ref name, sequence: 1 } if name == "Mystery"
        ));
    }

    #[test]
    fn empty_master_produces_no_sheets() {
        let workbook = build_workbook(&MasterTable::new(), &template(), &OutputLayout::default())
            .expect("exported");
        assert!(workbook.sheets.is_empty());
    }
}
