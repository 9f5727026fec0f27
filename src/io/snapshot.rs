use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{LedgerError, Result};
use crate::model::MasterTable;

/// Dumps the master table as pretty-printed JSON for auditing.
pub fn write_snapshot(path: &Path, master: &MasterTable) -> Result<()> {
    let json = serde_json::to_string_pretty(master)?;
    fs::write(path, json)?;
    info!(path = %path.display(), rows = master.len(), "master table snapshot written");
    Ok(())
}

/// Restores a master table previously written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<MasterTable> {
    if !path.exists() {
        return Err(LedgerError::MissingInput(path.to_path_buf()));
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
