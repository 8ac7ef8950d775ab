//! Trial summaries: repeated runs of one device combined by median.

use crate::analysis::extract::{analyze_run, RunEstimate};
use crate::analysis::stats::median;
use crate::error::{AppResult, EetimeError};
use crate::runlog::reader::load_complete_runs;
use crate::runlog::record::Header;
use std::path::{Path, PathBuf};
use tracing::info;

/// Median T50 / T100 over the complete runs of a trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    /// Header of the first complete run, standing in for the whole trial
    pub header: Header,
    /// Per-run estimates, in log order
    pub runs: Vec<RunEstimate>,
    /// Median T50 of the runs
    pub t50: f64,
    /// Median T100 of the runs
    pub t100: f64,
}

impl TrialSummary {
    /// Number of contributing runs
    pub fn n(&self) -> usize {
        self.runs.len()
    }
}

/// Analyze every complete run named by `args` (directories or `.jl` files).
///
/// Runs without a footer are skipped with a warning. A trial with no complete run at
/// all is [`EetimeError::NoCompleteRuns`].
pub fn analyze_trial<P: AsRef<Path>>(args: &[P]) -> AppResult<TrialSummary> {
    let runs = load_complete_runs(args)?;
    let Some(first) = runs.first() else {
        let origin = args
            .first()
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(PathBuf::new);
        return Err(EetimeError::NoCompleteRuns(origin));
    };
    let header = first.header.clone();

    let estimates: Vec<RunEstimate> = runs
        .iter()
        .map(|run| {
            let estimate = analyze_run(run);
            info!(
                path = %estimate.path.display(),
                "t50: {:.1} sec, t100: {:.1} sec",
                estimate.t50,
                estimate.t100
            );
            estimate
        })
        .collect();

    let t50s: Vec<f64> = estimates.iter().map(|e| e.t50).collect();
    let t100s: Vec<f64> = estimates.iter().map(|e| e.t100).collect();
    Ok(TrialSummary {
        header,
        t50: median(&t50s),
        t100: median(&t100s),
        runs: estimates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_run(dir: &Path, name: &str, percents: &[f64], complete: bool) {
        let mut lines = vec![
            r#"{"type": "header", "prog": "mock", "prog_dev": "2716", "datetime": "2022-03-23T04:05:06", "interval": 1.0, "erased_threshold": 20.0, "sn": "ee20", "bulb": "2"}"#
                .to_string(),
        ];
        for (i, p) in percents.iter().enumerate() {
            lines.push(format!(
                r#"{{"type": "read", "iter": {}, "seconds": {}.0, "read": "", "read_meta": "zlib", "complete_percent": 0.0, "erase_percent": {p:.1}, "erased": {}}}"#,
                i + 1,
                i,
                *p == 100.0
            ));
        }
        if complete {
            lines.push(
                r#"{"type": "footer", "erase_time": 0.0, "run_time": 0.0, "half_erase_time": null}"#
                    .to_string(),
            );
        }
        fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
    }

    #[test]
    fn medians_over_complete_runs() {
        let dir = tempdir().unwrap();
        // t50 = 1.5, t100 = 3
        write_run(dir.path(), "iter_01.jl", &[0.0, 40.0, 60.0, 100.0], true);
        // t50 = 2.5, t100 = 4
        write_run(dir.path(), "iter_02.jl", &[0.0, 20.0, 40.0, 60.0, 100.0], true);
        // No footer, skipped
        write_run(dir.path(), "iter_03.jl", &[0.0, 100.0, 100.0], false);
        // t50 = 0.5, t100 = 2
        write_run(dir.path(), "iter_04.jl", &[40.0, 60.0, 100.0], true);

        let trial = analyze_trial(&[dir.path()]).unwrap();
        assert_eq!(trial.n(), 3);
        assert_eq!(trial.header.sn.as_deref(), Some("EE20"));
        assert!((trial.t50 - 1.5).abs() < 1e-9);
        assert!((trial.t100 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn trial_without_complete_runs_is_an_error() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "iter_01.jl", &[0.0, 100.0], false);
        assert!(matches!(
            analyze_trial(&[dir.path()]),
            Err(EetimeError::NoCompleteRuns(_))
        ));
    }
}
