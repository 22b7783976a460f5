//! File access and deferred writes.

mod file_cache;
mod transaction;

pub use file_cache::{FileCache, RealFileCache, VirtualFS};
pub use transaction::{Action, CleanDir, MoveFile, Transaction, WriteFile};

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{Result, TtsError};

/// Reads and parses a JSON file through `fs`.
///
/// A missing file and malformed JSON are both fatal, reported with the path.
pub fn read_json<T: DeserializeOwned>(fs: &dyn FileCache, path: &Path) -> Result<T> {
    if !fs.exists(path) {
        return Err(TtsError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let content = fs.read(path)?;
    serde_json::from_str(&content).map_err(|source| TtsError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a file if it exists.
pub fn read_optional(fs: &dyn FileCache, path: &Path) -> Result<Option<String>> {
    if fs.exists(path) && !fs.is_dir(path) {
        Ok(Some(fs.read(path)?))
    } else {
        Ok(None)
    }
}

/// Pretty-prints a value as JSON with two-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
