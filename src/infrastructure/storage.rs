//! JSON persistence helpers for run records and policy files.
//!
//! All durable state in the core is pretty-printed JSON, one file per
//! record. Writers create parent directories; readers surface I/O and
//! parse failures through [`CoreError`] and leave skip-and-continue
//! decisions to the caller.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::{CoreError, CoreResult};

/// Write a value as pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| CoreError::malformed(path, e))?;
    fs::write(path, bytes).map_err(|e| CoreError::io(path, e))
}

/// Read and parse a JSON file into a typed value.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let bytes = fs::read(path).map_err(|e| CoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| CoreError::malformed(path, e))
}

/// Storage path for a run record inside a directory.
pub fn run_record_path(dir: &Path, run_id: &str) -> PathBuf {
    dir.join(format!("{run_id}.json"))
}
