//! Stamp metadata onto the headers of existing run logs.
//!
//! Only the first line of each log is rewritten; every following byte is copied as is.
//! The new file is written next to the old one and renamed over it, so a crash leaves
//! either the old or the new log, never a mix.

use crate::acquisition::session::RunMetadata;
use crate::error::{AppResult, EetimeError};
use crate::runlog::reader::list_logs;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Annotate every log directly inside `dir`; returns the files rewritten.
pub fn annotate_dir(dir: &Path, metadata: &RunMetadata) -> AppResult<Vec<PathBuf>> {
    let logs = list_logs(dir)?;
    for path in &logs {
        info!(path = %path.display(), "Opening");
        annotate_file(path, metadata)?;
    }
    Ok(logs)
}

/// Rewrite the header of one log. Fields left `None` keep their current value.
pub fn annotate_file(path: &Path, metadata: &RunMetadata) -> AppResult<()> {
    let text = fs::read(path)?;
    let split = text
        .iter()
        .position(|&b| b == b'\n')
        .map_or(text.len(), |i| i + 1);
    let (first, rest) = text.split_at(split);

    let mut header: Map<String, Value> = serde_json::from_slice(first)?;
    if header.get("type").and_then(Value::as_str) != Some("header") {
        return Err(EetimeError::MalformedLog {
            path: path.to_path_buf(),
            reason: "first record is not a header".to_string(),
        });
    }
    let fields = [
        ("user", &metadata.user),
        ("sn", &metadata.sn),
        ("eraser", &metadata.eraser),
        ("bulb", &metadata.bulb),
    ];
    for (key, value) in fields {
        if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
            header.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, &header)?;
    tmp.write_all(b"\n")?;
    tmp.write_all(rest)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| EetimeError::Io(e.error))?;
    Ok(())
}
