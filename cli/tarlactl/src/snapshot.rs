//! JSON snapshot files.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CliError;

/// Reads and parses a JSON snapshot.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::SnapshotRead {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| CliError::SnapshotParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load`], but a missing path means an empty list.
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, CliError> {
    match path {
        Some(path) => load(path),
        None => Ok(T::default()),
    }
}

/// Writes `data` as pretty JSON.
pub fn store<T: Serialize>(path: &Path, data: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(data).map_err(|source| CliError::SnapshotParse {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, json + "\n").map_err(|source| CliError::SnapshotWrite {
        path: path.to_path_buf(),
        source,
    })
}
