use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::model::{CellValue, SheetPeriod};

/// Worksheet name shapes accepted as a month key when no settings override them.
pub const DEFAULT_SHEET_NAME_FORMATS: [&str; 9] = [
    "%m/%Y", "%m.%Y", "%m-%Y", "%Y-%m", "%d.%m.%Y", "%d/%m/%Y", "%Y-%m-%d", "%B %Y", "%b %Y",
];

/// Formats tried in order for textual date cells.
pub const DEFAULT_DATE_FORMATS: [&str; 5] =
    ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Time-of-day tails tolerated after a date; `T` covers ISO 8601 text.
const TIME_SUFFIXES: [&str; 4] = [" %H:%M:%S", " %H:%M", "T%H:%M:%S%.f", "T%H:%M"];

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Decodes the month a worksheet belongs to from its name.
///
/// Formats without a day directive are matched against the name prefixed with
/// a first-of-month day, so `%m/%Y` accepts `03/2024`.
pub fn parse_sheet_period<S: AsRef<str>>(name: &str, formats: &[S]) -> Option<SheetPeriod> {
    let name = name.trim();
    formats.iter().find_map(|format| {
        let format = format.as_ref();
        let parsed = if format.contains("%d") || format.contains("%e") {
            NaiveDate::parse_from_str(name, format)
        } else {
            NaiveDate::parse_from_str(&format!("01 {name}"), &format!("%d {format}"))
        };
        parsed.ok().map(SheetPeriod::of)
    })
}

/// Parses a textual date, tolerating a trailing time of day.
pub fn parse_date_text<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    formats.iter().find_map(|format| {
        let format = format.as_ref();
        NaiveDate::parse_from_str(text, format).ok().or_else(|| {
            TIME_SUFFIXES.iter().find_map(|suffix| {
                NaiveDateTime::parse_from_str(text, &format!("{format}{suffix}"))
                    .ok()
                    .map(|value| value.date())
            })
        })
    })
}

/// Interprets a loaded date cell: explicit dates, Excel serials, or text.
pub fn parse_cell_date<S: AsRef<str>>(cell: &CellValue, formats: &[S]) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty => None,
        CellValue::Date(date) => Some(*date),
        CellValue::Number(serial) => excel_serial_to_date(*serial),
        CellValue::Text(text) => parse_date_text(text, formats),
    }
}

/// Replaces the year of `date` with `year`, clamping the day when the same
/// day does not exist in the target year (29 February).
pub fn with_year_clamped(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    date.with_year(year).or_else(|| {
        (1..=3)
            .filter_map(|back| NaiveDate::from_ymd_opt(year, date.month(), date.day() - back))
            .next()
    })
}

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Converts an Excel 1900-system serial into a calendar date. The time of day
/// is discarded.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let mut days = serial.floor() as i64;
    // Serials before 1900-03-01 sit before Excel's phantom 29 February 1900.
    if days < 61 {
        days += 1;
    }
    excel_epoch().checked_add_signed(Duration::days(days))
}

/// Converts a date into the Excel 1900-system serial written to output cells.
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    let mut days = date.signed_duration_since(excel_epoch()).num_days();
    if days < 61 {
        days -= 1;
    }
    days as f64
}
