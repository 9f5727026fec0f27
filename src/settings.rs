use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::io::excel_read::ConversionPolicy;
use crate::model::{PRICE_COLUMN_COUNT, PRICE_COLUMNS};
use crate::normalize::dates::{DEFAULT_DATE_FORMATS, DEFAULT_SHEET_NAME_FORMATS};

/// Highest zero-based column index an xlsx worksheet accepts.
const MAX_COLUMN: u32 = 16_383;

/// Run configuration. Every section falls back to the built-in layout, so a
/// settings file only needs to mention what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub source: SourceLayout,
    pub output: OutputLayout,
}

/// Files read and written by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub input: PathBuf,
    pub snapshot: PathBuf,
    pub output: PathBuf,
    pub template: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("fin.xlsx"),
            snapshot: PathBuf::from("file.json"),
            output: PathBuf::from("new.xlsx"),
            template: PathBuf::from("template.xlsx"),
        }
    }
}

/// Shape of the dated source worksheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLayout {
    pub date_column: usize,
    pub name_column: usize,
    /// Header names of the nine price columns, in slot order.
    pub price_columns: Vec<String>,
    /// A sheet is abandoned once more than this many consecutive rows lack a name.
    pub max_blank_names: usize,
    pub date_formats: Vec<String>,
    pub sheet_name_formats: Vec<String>,
    /// Moves explicit dates into the sheet's year unless the sheet is a December one.
    pub correct_year_mistakes: bool,
    pub on_conversion_error: ConversionPolicy,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            date_column: 0,
            name_column: 1,
            price_columns: PRICE_COLUMNS.iter().map(|name| name.to_string()).collect(),
            max_blank_names: 5,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            sheet_name_formats: DEFAULT_SHEET_NAME_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            correct_year_mistakes: true,
            on_conversion_error: ConversionPolicy::Skip,
        }
    }
}

/// Cell positions inside every generated month sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    /// First row receiving ledger rows; rows above it belong to the template.
    pub first_row: u32,
    pub date_column: u16,
    pub name_column: u16,
    /// Column of the first price; the other eight follow contiguously.
    pub first_price_column: u16,
    /// Excel number format applied to date cells.
    pub date_format: String,
    pub column_widths: BTreeMap<u16, f64>,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            first_row: 1,
            date_column: 0,
            name_column: 1,
            first_price_column: 3,
            date_format: "dd.mm.yyyy".to_string(),
            column_widths: BTreeMap::new(),
        }
    }
}

impl OutputLayout {
    /// Column receiving the given price slot.
    pub fn price_column(&self, slot: usize) -> u16 {
        self.first_price_column + slot as u16
    }
}

impl Settings {
    /// Reads a JSON settings file and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LedgerError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.output.validate()
    }
}

impl SourceLayout {
    fn validate(&self) -> Result<()> {
        if self.price_columns.len() != PRICE_COLUMN_COUNT {
            return Err(invalid(format!(
                "expected {PRICE_COLUMN_COUNT} price columns, found {}",
                self.price_columns.len()
            )));
        }
        let mut seen = BTreeSet::new();
        for name in &self.price_columns {
            let name = name.trim();
            if name.is_empty() {
                return Err(invalid("price column names must not be empty"));
            }
            if !seen.insert(name) {
                return Err(invalid(format!("duplicate price column '{name}'")));
            }
        }
        if self.date_column == self.name_column {
            return Err(invalid("date and name columns must differ"));
        }
        if self.date_formats.is_empty() {
            return Err(invalid("at least one date format is required"));
        }
        if self.sheet_name_formats.is_empty() {
            return Err(invalid("at least one sheet name format is required"));
        }
        Ok(())
    }
}

impl OutputLayout {
    fn validate(&self) -> Result<()> {
        let last_price = u32::from(self.first_price_column) + PRICE_COLUMN_COUNT as u32 - 1;
        if last_price > MAX_COLUMN {
            return Err(invalid("price columns run past the last worksheet column"));
        }
        let prices = u32::from(self.first_price_column)..=last_price;
        if self.date_column == self.name_column {
            return Err(invalid("output date and name columns must differ"));
        }
        for (label, column) in [("date", self.date_column), ("name", self.name_column)] {
            if prices.contains(&u32::from(column)) {
                return Err(invalid(format!(
                    "output {label} column {column} overlaps the price columns"
                )));
            }
        }
        if self.date_format.trim().is_empty() {
            return Err(invalid("date number format must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> LedgerError {
    LedgerError::InvalidSettings(message.into())
}
