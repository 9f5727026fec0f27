use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Rewrites a locale decimal comma into the '.' separator.
pub fn repair_separator(text: &str) -> String {
    text.replace(',', ".")
}

/// Parses a price string written with either '.' or ',' as the decimal
/// separator. Blank or malformed input yields `None`.
///
/// Only digits, signs, separators and an exponent marker are accepted, so
/// digit-grouping characters such as `_` or spaces reject the cell instead of
/// being folded into the number.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.chars().all(is_numeric_char) {
        return None;
    }
    let repaired = repair_separator(trimmed);
    let unsigned = repaired.strip_prefix('+').unwrap_or(&repaired);
    Decimal::from_str(unsigned)
        .or_else(|_| Decimal::from_scientific(unsigned))
        .ok()
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ',' | 'e' | 'E')
}

/// Converts a numeric cell into a decimal, rejecting NaN and infinities.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}

/// Numeric value written into output cells.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
