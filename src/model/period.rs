use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar month a worksheet belongs to, decoded from its name.
///
/// Ordering is chronological (year first), which the exporter relies on when
/// it compares the month of consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SheetPeriod {
    pub year: i32,
    pub month: u32,
}

impl SheetPeriod {
    /// Builds a period, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Period containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Key used for loaded source tables, e.g. `03/2024`.
    pub fn table_name(&self) -> String {
        self.render('/')
    }

    /// Name of the generated month worksheet, e.g. `03-2024`.
    pub fn sheet_name(&self) -> String {
        self.render('-')
    }

    pub fn is_december(&self) -> bool {
        self.month == 12
    }

    fn render(&self, separator: char) -> String {
        format!("{:02}{separator}{:04}", self.month, self.year)
    }
}

impl fmt::Display for SheetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_name())
    }
}
