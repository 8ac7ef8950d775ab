//! Per-trial table generation.
//!
//! Walks a tree of run directories, summarizes each as one trial, joins the trial's
//! serial number against the identity table and normalizes its times by the bulb
//! scalar. The resulting CSV is the input of [`crate::analysis::aggregate`].
//!
//! # Failure policy
//!
//! Strict mode aborts on the first bad directory, missing serial number, unknown bulb or
//! eraser mismatch. Otherwise each is logged and the directory skipped, except a missing
//! serial number, which still writes its row with empty vendor and device.
//! Errors that indicate a log the reader does not understand always abort.

use crate::analysis::identity::IdentityTable;
use crate::analysis::one_decimal;
use crate::analysis::trial::{analyze_trial, TrialSummary};
use crate::config::AnalysisConfig;
use crate::error::{AppResult, EetimeError};
use crate::runlog::reader::find_log_dirs;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Normalization and failure policy for table generation.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Abort on the first bad trial instead of skipping it
    pub strict: bool,
    /// When set, every trial's eraser must contain this name
    pub reference_eraser: Option<String>,
    /// Bulb id to intensity scalar
    pub bulb_scalars: BTreeMap<String, f64>,
}

impl TableOptions {
    /// Options from the `[analysis]` configuration section.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            strict: config.strict,
            reference_eraser: config.reference_eraser.clone(),
            bulb_scalars: config.bulb_scalars.clone(),
        }
    }

    /// Override the failure policy.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Outcome of a table generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    /// Rows written
    pub written: usize,
    /// Directories examined
    pub attempted: usize,
}

/// Column names of the per-trial table, in [`TrialRow`] field order.
pub const TABLE_COLUMNS: [&str; 13] = [
    "dir", "sn", "vendor", "device", "prog", "prog_dev", "eraser", "bulb", "N", "t50_raw",
    "t100_raw", "t50_norm", "t100_norm",
];

/// One row of the per-trial table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRow {
    /// Trial directory
    pub dir: String,
    /// Serial number
    pub sn: String,
    /// Manufacturer; empty when the serial number is unknown
    pub vendor: String,
    /// Device model; empty when the serial number is unknown
    pub device: String,
    /// Programmer that sampled the trial
    pub prog: String,
    /// Device name given to the programmer
    pub prog_dev: String,
    /// Eraser fixture
    pub eraser: String,
    /// Bulb id
    pub bulb: String,
    /// Complete runs in the trial
    #[serde(rename = "N")]
    pub n: usize,
    /// Median T50 in seconds
    #[serde(with = "one_decimal")]
    pub t50_raw: f64,
    /// Median T100 in seconds
    #[serde(with = "one_decimal")]
    pub t100_raw: f64,
    /// `t50_raw` scaled by the bulb scalar
    #[serde(with = "one_decimal")]
    pub t50_norm: f64,
    /// `t100_raw` scaled by the bulb scalar
    #[serde(with = "one_decimal")]
    pub t100_norm: f64,
}

/// Scale raw trial times by the bulb intensity scalar.
///
/// Returns `(t50_norm, t100_norm)`.
pub fn normalize(trial: &TrialSummary, options: &TableOptions) -> AppResult<(f64, f64)> {
    if let Some(expected) = &options.reference_eraser {
        let found = trial.header.eraser.as_deref().unwrap_or_default();
        if !found.contains(expected.as_str()) {
            return Err(EetimeError::EraserMismatch {
                expected: expected.clone(),
                found: found.to_string(),
            });
        }
    }
    let bulb = trial.header.bulb.as_deref().unwrap_or_default();
    let scalar = options
        .bulb_scalars
        .get(bulb)
        .ok_or_else(|| EetimeError::UnknownBulb(bulb.to_string()))?;
    Ok((trial.t50 * scalar, trial.t100 * scalar))
}

/// Build the table row for one trial directory.
fn trial_row(
    dir: &Path,
    identities: &IdentityTable,
    options: &TableOptions,
) -> AppResult<TrialRow> {
    let trial = analyze_trial(&[dir])?;
    let header = &trial.header;
    let sn = header.sn.clone().unwrap_or_default();

    let (vendor, device) = match identities.lookup(&sn) {
        Some(id) => (id.vendor.clone(), id.model.clone()),
        None => {
            let err = EetimeError::UnknownSerial(sn.clone());
            if options.strict {
                return Err(err);
            }
            warn!(dir = %dir.display(), sn = %sn, "{}", err);
            (String::new(), String::new())
        }
    };

    let (t50_norm, t100_norm) = normalize(&trial, options)?;
    Ok(TrialRow {
        dir: dir.display().to_string(),
        sn,
        vendor,
        device,
        prog: header.prog.clone(),
        prog_dev: header.prog_dev.clone(),
        eraser: header.eraser.clone().unwrap_or_default(),
        bulb: header.bulb.clone().unwrap_or_default(),
        n: trial.n(),
        t50_raw: trial.t50,
        t100_raw: trial.t100,
        t50_norm,
        t100_norm,
    })
}

/// Write the per-trial table for every log directory under `root` to `out`.
pub fn generate_table(
    root: &Path,
    out: &Path,
    identities: &IdentityTable,
    options: &TableOptions,
) -> AppResult<ReportSummary> {
    // Header written up front so a table with no rows still names its columns
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(out)?;
    writer.write_record(TABLE_COLUMNS)?;
    writer.flush()?;
    let mut summary = ReportSummary {
        written: 0,
        attempted: 0,
    };

    for dir in find_log_dirs(root)? {
        summary.attempted += 1;
        match trial_row(&dir, identities, options) {
            Ok(row) => {
                writer.serialize(&row)?;
                writer.flush()?;
                summary.written += 1;
            }
            Err(err) if !options.strict && err.is_recoverable() => {
                warn!(dir = %dir.display(), "skipping: {}", err);
            }
            Err(err) => return Err(err),
        }
    }
    writer.flush()?;

    info!(
        "Wrote {} / {} entries to {}",
        summary.written,
        summary.attempted,
        out.display()
    );
    Ok(summary)
}
