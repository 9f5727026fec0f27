use std::path::Path;

use tracing::{info, instrument};

use crate::consolidate::consolidate;
use crate::error::{LedgerError, Result};
use crate::export::build_workbook;
use crate::io::{excel_read, excel_write, snapshot, template};
use crate::model::MasterTable;
use crate::settings::Settings;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub source_sheets: usize,
    pub rows: usize,
    pub month_sheets: usize,
}

/// Loads the dated worksheets of the input workbook and consolidates them.
///
/// Returns the master table together with the number of worksheets that were
/// recognised as months.
#[instrument(level = "info", skip_all, fields(input = %settings.paths.input.display()))]
pub fn consolidate_workbook(settings: &Settings) -> Result<(MasterTable, usize)> {
    let input = &settings.paths.input;
    require_file(input)?;

    let mut handler = settings.source.on_conversion_error;
    let tables = excel_read::read_sheet_tables(input, &settings.source, &mut handler)?;
    let master = consolidate(&tables, &settings.source)?;
    Ok((master, tables.len()))
}

/// Writes the master table into month sheets cloned from the template.
/// Returns the number of month sheets written.
#[instrument(
    level = "info",
    skip_all,
    fields(template = %settings.paths.template.display(), output = %settings.paths.output.display())
)]
pub fn export_master(master: &MasterTable, settings: &Settings) -> Result<usize> {
    let template_path = &settings.paths.template;
    require_file(template_path)?;

    let template = template::read_template(template_path)?;
    let workbook = build_workbook(master, &template, &settings.output)?;
    excel_write::write_workbook(&settings.paths.output, &workbook, &settings.output)?;
    Ok(workbook.sheets.len())
}

/// Full run: load, consolidate, snapshot, export.
#[instrument(level = "info", skip_all)]
pub fn run(settings: &Settings) -> Result<RunSummary> {
    require_file(&settings.paths.template)?;

    let (master, source_sheets) = consolidate_workbook(settings)?;
    snapshot::write_snapshot(&settings.paths.snapshot, &master)?;
    let month_sheets = export_master(&master, settings)?;

    let summary = RunSummary {
        source_sheets,
        rows: master.len(),
        month_sheets,
    };
    info!(
        source_sheets = summary.source_sheets,
        rows = summary.rows,
        month_sheets = summary.month_sheets,
        "done"
    );
    Ok(summary)
}

/// Consolidates and writes the snapshot without producing the output workbook.
#[instrument(level = "info", skip_all)]
pub fn consolidate_to_snapshot(settings: &Settings) -> Result<RunSummary> {
    let (master, source_sheets) = consolidate_workbook(settings)?;
    snapshot::write_snapshot(&settings.paths.snapshot, &master)?;
    Ok(RunSummary {
        source_sheets,
        rows: master.len(),
        month_sheets: 0,
    })
}

/// Exports a previously written snapshot.
#[instrument(level = "info", skip_all, fields(snapshot = %settings.paths.snapshot.display()))]
pub fn export_snapshot(settings: &Settings) -> Result<RunSummary> {
    let master = snapshot::read_snapshot(&settings.paths.snapshot)?;
    let month_sheets = export_master(&master, settings)?;
    Ok(RunSummary {
        source_sheets: 0,
        rows: master.len(),
        month_sheets,
    })
}

fn require_file(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LedgerError::MissingInput(path.to_path_buf()))
    }
}
