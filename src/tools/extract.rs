//! Recover the initial snapshot stored in a run header.

use crate::error::{AppResult, EetimeError};
use crate::runlog::reader::{list_logs, load_run};
use crate::runlog::snapshot;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const BYTES_PER_ROW: usize = 16;
const BYTES_PER_HALF_ROW: usize = 8;

/// Resolve a log argument: a file as given, a directory to its first log.
pub fn resolve_log(path: &Path) -> AppResult<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }
    list_logs(path)?
        .into_iter()
        .next()
        .ok_or_else(|| EetimeError::NoCompleteRuns(path.to_path_buf()))
}

/// Decode the image read before sampling started.
pub fn initial_snapshot(path: &Path) -> AppResult<Vec<u8>> {
    let path = resolve_log(path)?;
    tracing::info!(path = %path.display(), "Opening");
    let run = load_run(&path)?;
    let encoded = run.header.read.ok_or_else(|| EetimeError::MalformedLog {
        path: path.clone(),
        reason: "header has no initial read".to_string(),
    })?;
    snapshot::decode(&encoded)
}

/// Classic 16 bytes per row hexdump with an ASCII column.
///
/// With `terse`, runs of identical rows collapse to a single `...` line; the row
/// ending a run is shown again for continuity and the final row is always shown.
pub fn hexdump(data: &[u8], terse: bool) -> String {
    let rows: Vec<&[u8]> = data.chunks(BYTES_PER_ROW).collect();
    let mut out = String::new();
    let mut prev: Option<&[u8]> = None;
    let mut dotted = false;

    let mut i = 0;
    while i < rows.len() {
        if terse && i + 1 < rows.len() {
            if prev == Some(rows[i]) {
                if !dotted {
                    out.push_str("...\n");
                    dotted = true;
                }
                i += 1;
                continue;
            }
            prev = Some(rows[i]);
            if dotted {
                dotted = false;
                prev = None;
                i -= 1;
            }
        }
        write_row(&mut out, i * BYTES_PER_ROW, rows[i]);
        i += 1;
    }
    out
}

fn write_row(out: &mut String, offset: usize, row: &[u8]) {
    let _ = write!(out, "{offset:08X}  ");
    for half in 0..2 {
        for col in 0..BYTES_PER_HALF_ROW {
            match row.get(half * BYTES_PER_HALF_ROW + col) {
                Some(byte) => {
                    let _ = write!(out, "{byte:02X} ");
                }
                None => out.push_str("   "),
            }
        }
        out.push(' ');
    }
    out.push('|');
    for &byte in row {
        out.push(if (b' '..=b'~').contains(&byte) {
            byte as char
        } else {
            '.'
        });
    }
    out.push_str(&" ".repeat(BYTES_PER_ROW - row.len()));
    out.push_str("|\n");
}
