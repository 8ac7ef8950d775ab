//! Loading run logs from disk.

use crate::error::{AppResult, EetimeError};
use crate::runlog::record::{Footer, Header, ReadSample, Record, TimeoutRecord, KNOWN_TAGS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of run logs.
pub const LOG_EXTENSION: &str = "jl";

/// A parsed run log.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLog {
    /// File the log was loaded from
    pub path: PathBuf,
    /// Header with the serial number uppercased
    pub header: Header,
    /// Samples in file order
    pub reads: Vec<ReadSample>,
    /// Present only for completed runs
    pub footer: Option<Footer>,
    /// Present only for runs that timed out
    pub timeout: Option<TimeoutRecord>,
}

impl RunLog {
    /// A run is usable for analysis only if it reached its footer.
    pub fn is_complete(&self) -> bool {
        self.footer.is_some()
    }

    /// Elapsed seconds of every sample.
    pub fn times(&self) -> Vec<f64> {
        self.reads.iter().map(|r| r.seconds).collect()
    }

    /// Erase percentage of every sample.
    pub fn percentages(&self) -> Vec<f64> {
        self.reads.iter().map(|r| r.erase_percent).collect()
    }
}

#[derive(Deserialize)]
struct Tagged {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Parse a single log line, rejecting tags this reader does not understand.
pub fn parse_record(path: &Path, line_no: usize, line: &str) -> AppResult<Record> {
    let malformed = |reason: String| EetimeError::MalformedLog {
        path: path.to_path_buf(),
        reason: format!("line {line_no}: {reason}"),
    };

    let tagged: Tagged = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
    let kind = tagged
        .kind
        .ok_or_else(|| malformed("record has no type".to_string()))?;
    if !KNOWN_TAGS.contains(&kind.as_str()) {
        return Err(EetimeError::UnknownRecord {
            path: path.to_path_buf(),
            line: line_no,
            tag: kind,
        });
    }
    serde_json::from_str(line).map_err(|e| malformed(e.to_string()))
}

/// Load and structurally validate one run log.
///
/// Enforced: exactly one header, first; reads in non-decreasing time order; a footer or
/// timeout record, if present, is the last record. Serial numbers are uppercased.
pub fn load_run(path: &Path) -> AppResult<RunLog> {
    let text = fs::read_to_string(path)?;
    let malformed = |reason: &str| EetimeError::MalformedLog {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut header: Option<Header> = None;
    let mut reads: Vec<ReadSample> = Vec::new();
    let mut footer: Option<Footer> = None;
    let mut timeout: Option<TimeoutRecord> = None;

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        if footer.is_some() || timeout.is_some() {
            return Err(malformed(&format!(
                "line {line_no}: record after end of run"
            )));
        }

        match parse_record(path, line_no, line)? {
            Record::Header(mut h) => {
                if header.is_some() {
                    return Err(malformed(&format!("line {line_no}: duplicate header")));
                }
                h.sn = h.sn.map(|sn| sn.to_uppercase());
                header = Some(h);
            }
            record if header.is_none() => {
                return Err(malformed(&format!(
                    "line {line_no}: '{}' record before header",
                    record.tag()
                )));
            }
            Record::Read(sample) => {
                if let Some(prev) = reads.last() {
                    if sample.seconds < prev.seconds {
                        return Err(malformed(&format!(
                            "line {line_no}: time went backwards ({} < {})",
                            sample.seconds, prev.seconds
                        )));
                    }
                }
                reads.push(sample);
            }
            Record::Footer(f) => footer = Some(f),
            Record::Timeout(t) => timeout = Some(t),
        }
    }

    let header = header.ok_or_else(|| malformed("no header"))?;
    Ok(RunLog {
        path: path.to_path_buf(),
        header,
        reads,
        footer,
        timeout,
    })
}

/// All `*.jl` files directly inside `dir`, sorted.
pub fn list_logs(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == LOG_EXTENSION) {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}

/// Expand a mix of directories and files into a sorted list of log paths.
pub fn collect_run_paths<P: AsRef<Path>>(args: &[P]) -> AppResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        if arg.is_dir() {
            paths.extend(list_logs(arg)?);
        } else {
            paths.push(arg.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every log named by `args`, skipping runs that never wrote a footer.
///
/// Truncated or otherwise malformed logs are skipped with a warning. An unrecognized
/// record tag or an I/O failure still aborts the load.
pub fn load_complete_runs<P: AsRef<Path>>(args: &[P]) -> AppResult<Vec<RunLog>> {
    let mut runs = Vec::new();
    for path in collect_run_paths(args)? {
        let run = match load_run(&path) {
            Ok(run) => run,
            Err(EetimeError::MalformedLog { reason, .. }) => {
                tracing::warn!(path = %path.display(), %reason, "skipping malformed run");
                continue;
            }
            Err(e) => return Err(e),
        };
        if !run.is_complete() {
            tracing::warn!(path = %path.display(), "skipping incomplete run (no footer)");
            continue;
        }
        runs.push(run);
    }
    Ok(runs)
}

/// Recursively find directories that directly contain run logs, sorted.
pub fn find_log_dirs(root: &Path) -> AppResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk_log_dirs(root, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk_log_dirs(dir: &Path, found: &mut Vec<PathBuf>) -> AppResult<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    if !list_logs(dir)?.is_empty() {
        found.push(dir.to_path_buf());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_log_dirs(&path, found)?;
        }
    }
    Ok(())
}
