//! Append-only CSV record store.
//!
//! Column order is fixed by [`STORE_HEADER`]. The header is written only when
//! the file is empty at the first append of a process.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use harvester_core::{HarvestRecord, KnownKeySet, RecordError, STORE_HEADER};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on record store: {0}")]
    Io(#[from] io::Error),
    #[error("csv error on record store: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid record: {0}")]
    Invalid(#[from] RecordError),
}

pub struct RecordStore {
    path: PathBuf,
    writer: csv::Writer<File>,
    header_pending: bool,
}

impl RecordStore {
    /// Open (creating if needed) the store for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let header_pending = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self {
            path,
            writer,
            header_pending,
        })
    }

    /// Keys of every record already in the store.
    ///
    /// A missing file yields an empty set. An unreadable or corrupt file is
    /// logged and also yields an empty set; re-harvesting beats aborting.
    pub fn load_known_keys(&self) -> KnownKeySet {
        match read_keys(&self.path) {
            Ok(keys) => keys,
            Err(StoreError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                KnownKeySet::new()
            }
            Err(err) => {
                engine_warn!(
                    "Could not read existing record store {:?}, starting fresh: {}",
                    self.path,
                    err
                );
                KnownKeySet::new()
            }
        }
    }

    /// Append one record and sync it to disk before returning.
    pub fn append(&mut self, record: &HarvestRecord) -> Result<(), StoreError> {
        record.validate()?;
        if self.header_pending {
            self.writer.write_record(STORE_HEADER)?;
        }
        self.writer.write_record(record.to_row())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.header_pending = false;
        Ok(())
    }
}

fn read_keys(path: &Path) -> Result<KnownKeySet, StoreError> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(StoreError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    if !headers.is_empty() && headers.iter().ne(STORE_HEADER.iter().copied()) {
        engine_warn!(
            "Record store {:?} has unexpected header {:?}; treating first row as header",
            path,
            headers
        );
    }

    let mut keys = KnownKeySet::new();
    for row in reader.records() {
        let row = row?;
        if let Some(key) = row.get(0).filter(|key| !key.is_empty()) {
            keys.insert(key);
        }
    }
    engine_info!("Loaded {} known keys from {:?}", keys.len(), path);
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_is_reported_as_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = read_keys(&temp.path().join("absent.csv")).unwrap_err();
        assert!(
            matches!(&err, StoreError::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn directory_is_not_read_as_a_store() {
        let temp = tempfile::tempdir().unwrap();
        let err = read_keys(temp.path()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
