use std::path::{Path, PathBuf};

use harvester_core::RunSummary;

use crate::persist::{AtomicFileWriter, PersistError};

/// Write `summary` as pretty JSON to `path`, atomically.
pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<PathBuf, PersistError> {
    let json = serde_json::to_vec_pretty(summary)
        .map_err(|err| PersistError::Io(std::io::Error::other(err)))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PersistError::OutputDir(format!("no file name in {}", path.display())))?;
    AtomicFileWriter::new(dir).write(filename, &json)
}
