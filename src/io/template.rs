use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::{info, warn};

use crate::error::{LedgerError, Result};
use crate::export::{OutputCell, TemplateSheet};
use crate::normalize::dates::excel_serial_to_date;

/// Reads the layout worksheet cloned into every month sheet. The template
/// workbook is expected to hold a single worksheet; only the first is used.
///
/// Only cell values are carried over. Cell styles, number formats and column
/// widths of the template are not read; month sheets take the date format and
/// column widths from [`OutputLayout`](crate::settings::OutputLayout).
pub fn read_template(path: &Path) -> Result<TemplateSheet> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let Some(first) = sheet_names.first() else {
        return Err(LedgerError::InvalidWorkbook(format!(
            "template '{}' has no worksheet",
            path.display()
        )));
    };
    if sheet_names.len() > 1 {
        warn!(
            template = %path.display(),
            sheets = sheet_names.len(),
            used = %first,
            "template has more than one worksheet"
        );
    }

    let range = workbook
        .worksheet_range(first)
        .ok_or_else(|| LedgerError::InvalidWorkbook(format!("missing sheet '{first}'")))??;
    let template = template_from_range(first, &range);
    info!(sheet = %template.name, cells = template.cells.len(), "loaded template");
    Ok(template)
}

/// Collects the non-empty cells of a worksheet at their absolute positions.
pub fn template_from_range(name: &str, range: &Range<DataType>) -> TemplateSheet {
    let mut template = TemplateSheet::new(name);
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    for (row, col, cell) in range.cells() {
        let Some(value) = template_cell(cell) else {
            continue;
        };
        let position = (start_row + row as u32, (start_col + col as u32) as u16);
        template.cells.insert(position, value);
    }

    template
}

fn template_cell(cell: &DataType) -> Option<OutputCell> {
    match cell {
        DataType::Empty => None,
        DataType::String(value) if value.is_empty() => None,
        DataType::String(value) => Some(OutputCell::Text(value.clone())),
        DataType::Float(value) => Some(OutputCell::Number(*value)),
        DataType::Int(value) => Some(OutputCell::Number(*value as f64)),
        DataType::Bool(value) => Some(OutputCell::Bool(*value)),
        DataType::DateTime(serial) => excel_serial_to_date(*serial).map(OutputCell::Date),
        DataType::Error(_) => None,
        other => Some(OutputCell::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_non_empty_cells_at_absolute_positions() {
        let mut range = Range::new((0, 1), (1, 3));
        range.set_value((0, 1), DataType::String("Date".into()));
        range.set_value((0, 2), DataType::String("Name".into()));
        range.set_value((0, 3), DataType::String(String::new()));
        range.set_value((1, 3), DataType::Float(0.0));

        let template = template_from_range("Layout", &range);

        assert_eq!(template.name, "Layout");
        assert_eq!(template.cells.len(), 3);
        assert_eq!(
            template.cells.get(&(0, 1)),
            Some(&OutputCell::Text("Date".into()))
        );
        assert_eq!(template.cells.get(&(1, 3)), Some(&OutputCell::Number(0.0)));
        assert_eq!(template.cells.get(&(0, 3)), None);
    }
}
