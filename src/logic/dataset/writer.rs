use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::logic::error::DatasetError;

/// Write rows as CSV with a header row.
///
/// Rows go to a sibling temp file first and are renamed into place, so a
/// crashed run never leaves a truncated dataset behind.
pub fn write_dataset<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_path(&tmp)?;

        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read every row of a dataset file
pub fn read_dataset<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;

    if rows.is_empty() {
        return Err(DatasetError::Empty(path.display().to_string()));
    }

    Ok(rows)
}

/// Header row of a dataset file
pub fn read_header(path: &Path) -> Result<Vec<String>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

/// SHA-256 of the file contents (recorded with trained artifacts)
pub fn dataset_fingerprint(path: &Path) -> Result<String, DatasetError> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Sibling `<name>.tmp` path used for atomic writes
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
