use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

mod period;

pub use period::SheetPeriod;

/// Number of positional price fields carried by every ledger row.
pub const PRICE_COLUMN_COUNT: usize = 9;

/// Header names identifying the price columns of a source worksheet.
pub const PRICE_COLUMNS: [&str; PRICE_COLUMN_COUNT] = [
    "Col1", "Col2", "Col3", "Col4", "Col5", "Col6", "Col7", "Col8", "Col9",
];

/// Fixed set of price slots, `None` meaning the source had no usable value.
pub type Prices = [Option<Decimal>; PRICE_COLUMN_COUNT];

/// A single cell as loaded from a source worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// Empty cells and whitespace-only text are both blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    /// String form of the cell, as used for names and separator repair.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(value) => value.to_string(),
            CellValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Tabular view of one dated source worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    /// Table key derived from the period, e.g. `03/2024`.
    pub name: String,
    /// Worksheet name as it appears in the source workbook.
    pub source_name: String,
    pub period: SheetPeriod,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Absolute (row, column) of the header row's first cell.
    pub origin: (u32, u32),
}

impl SheetTable {
    pub fn new(source_name: impl Into<String>, period: SheetPeriod) -> Self {
        Self {
            name: period.table_name(),
            source_name: source_name.into(),
            period,
            headers: Vec::new(),
            rows: Vec::new(),
            origin: (0, 0),
        }
    }

    /// Returns the cell at the given data row and column, or an empty cell when
    /// the row is shorter than the header.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Maps each header matching one of `price_names` (after trimming) to its
    /// price slot. Returns `(column, slot)` pairs in column order.
    pub fn price_columns<S: AsRef<str>>(&self, price_names: &[S]) -> Vec<(usize, usize)> {
        self.headers
            .iter()
            .enumerate()
            .filter_map(|(column, header)| {
                let header = header.trim();
                price_names
                    .iter()
                    .position(|name| name.as_ref() == header)
                    .map(|slot| (column, slot))
            })
            .collect()
    }

    /// Absolute A1 reference of a data cell.
    pub fn cell_reference(&self, row: usize, column: usize) -> String {
        cell_reference(
            self.origin.0 + 1 + row as u32,
            self.origin.1 + column as u32,
        )
    }

    /// One-based worksheet row number of a data row.
    pub fn sheet_row_number(&self, row: usize) -> u32 {
        self.origin.0 + 2 + row as u32
    }
}

/// A consolidated ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRow {
    pub date: Option<NaiveDate>,
    pub name: String,
    pub prices: Prices,
    /// Table name of the worksheet the row was read from.
    pub source_sheet: String,
}

impl MasterRow {
    pub fn price_count(&self) -> usize {
        self.prices.iter().filter(|price| price.is_some()).count()
    }
}

/// All qualifying rows of every source worksheet, in consolidation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterTable {
    pub rows: Vec<MasterRow>,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: MasterRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MasterRow> {
        self.rows.iter()
    }
}

/// Converts zero-based coordinates into an A1 style reference.
pub fn cell_reference(row: u32, column: u32) -> String {
    let mut letters = Vec::new();
    let mut remaining = column + 1;
    while remaining > 0 {
        let offset = ((remaining - 1) % 26) as u8;
        letters.push((b'A' + offset) as char);
        remaining = (remaining - 1) / 26;
    }
    let column_name: String = letters.into_iter().rev().collect();
    format!("{column_name}{}", row + 1)
}
