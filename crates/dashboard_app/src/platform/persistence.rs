use std::path::{Path, PathBuf};

use chrono::Utc;
use festival_client::{result_filename, AtomicFileWriter, Operation, PersistError};
use client_logging::client_info;
use serde::Serialize;
use serde_json::Value;

/// What lands on disk for a finished analysis.
#[derive(Debug, Serialize)]
struct SavedResult<'a> {
    saved_at: String,
    label: String,
    request: Value,
    result: &'a Value,
}

pub(crate) fn save_result(
    dir: &Path,
    operation: &Operation,
    data: &Value,
) -> Result<PathBuf, PersistError> {
    let envelope = SavedResult {
        saved_at: Utc::now().to_rfc3339(),
        label: operation.label(),
        request: operation.body(),
        result: data,
    };
    let value = serde_json::to_value(&envelope)?;
    let path = AtomicFileWriter::new(dir.to_path_buf())
        .write_json(&result_filename(operation), &value)?;
    client_info!("saved result of {} to {:?}", operation.label(), path);
    Ok(path)
}
