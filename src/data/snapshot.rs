//! The snapshot: a JSON array of validated records written by the preparation step
//! and read once at startup. Nothing at runtime writes it.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::data::record::CrashRecord;
use crate::error::SnapshotError;

pub fn load_snapshot(path: &Path) -> Result<Vec<CrashRecord>, SnapshotError> {
    let raw = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<CrashRecord> =
        serde_json::from_str(&raw).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), records = records.len(), "loaded snapshot");
    Ok(records)
}

/// Write records as pretty JSON, creating parent directories when absent.
pub fn write_snapshot(path: &Path, records: &[CrashRecord]) -> Result<(), SnapshotError> {
    let serialized = serde_json::to_string_pretty(records).map_err(SnapshotError::Serialize)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SnapshotError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, serialized).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), records = records.len(), "wrote snapshot");
    Ok(())
}
