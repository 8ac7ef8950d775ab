//! Per-log T50 / T100 extraction.
//!
//! Both estimators work on the `(seconds, erase_percent)` series of one run. Degenerate
//! input never aborts a batch: [`analyze_run`] turns every failure into a 0.0 sentinel
//! and a warning naming the log.

use crate::error::{AppResult, EetimeError};
use crate::runlog::reader::RunLog;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Erase percentage T50 is interpolated at.
pub const HALF_ERASED: f64 = 50.0;

/// Erase percentage of a fully erased sample.
pub const FULLY_ERASED: f64 = 100.0;

/// T50 and T100 of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEstimate {
    /// Log the estimate came from
    pub path: PathBuf,
    /// Seconds to 50% erased; 0.0 if unavailable
    pub t50: f64,
    /// Seconds to stable 100% erased; 0.0 if unavailable
    pub t100: f64,
}

/// Elapsed time from which the tail of the run reads 100% without a break.
///
/// Scans backwards to the last sample below 100% and returns the time of the sample
/// after it. Returns 0.0 when the series is empty, when the final sample is not 100%,
/// or when every sample is 100% (there is no unstable point to anchor on).
pub fn find_t100(times: &[f64], percents: &[f64]) -> f64 {
    let Some(&last) = percents.last() else {
        warn!("T100: no samples");
        return 0.0;
    };
    if last < FULLY_ERASED {
        warn!("T100: final sample is {:.3}%, run never settled at 100%", last);
        return 0.0;
    }

    let mut next_time = None;
    for (&t, &p) in times.iter().zip(percents).rev() {
        if p < FULLY_ERASED {
            return next_time.unwrap_or(0.0);
        }
        next_time = Some(t);
    }
    warn!("T100: every sample reads 100%, no transition to anchor on");
    0.0
}

/// Linearly interpolate the time the series crosses `threshold` percent.
///
/// The pair used is the first sample at or above the threshold and its predecessor.
/// When the very first sample already qualifies, samples 0 and 1 are used. Equal
/// percentages in the pair (a plateau) advance the pair forward with a warning.
pub fn interpolate_t50(times: &[f64], percents: &[f64], threshold: f64) -> AppResult<f64> {
    let len = times.len().min(percents.len());
    if len < 2 {
        return Err(EetimeError::InterpolationFailed(format!(
            "need at least 2 samples, have {len}"
        )));
    }

    let mut i = percents[..len]
        .iter()
        .position(|&p| p >= threshold)
        .ok_or_else(|| {
            EetimeError::InterpolationFailed(format!("never reached {threshold}%"))
        })?
        .max(1);

    while percents[i - 1] == percents[i] {
        warn!(
            "T50: plateau at {:.3}% between t={:.1} and t={:.1}, advancing",
            percents[i], times[i - 1], times[i]
        );
        i += 1;
        if i >= len {
            return Err(EetimeError::InterpolationFailed(format!(
                "no distinct sample pair after plateau at {:.3}%",
                percents[len - 1]
            )));
        }
    }

    let (t0, t1) = (times[i - 1], times[i]);
    let (y0, y1) = (percents[i - 1], percents[i]);
    let t = t0 + (threshold - y0) * (t1 - t0) / (y1 - y0);
    debug!(t0, y0, t1, y1, t, "T50 interpolated");
    Ok(t)
}

/// T50 and T100 of one complete run, with 0.0 standing in for any degenerate estimate.
pub fn analyze_run(run: &RunLog) -> RunEstimate {
    let path = run.path.clone();
    if run.reads.is_empty() {
        warn!(path = %path.display(), "degenerate run: footer but no samples");
        return RunEstimate {
            path,
            t50: 0.0,
            t100: 0.0,
        };
    }

    let times = run.times();
    let percents = run.percentages();
    let t50 = interpolate_t50(&times, &percents, HALF_ERASED).unwrap_or_else(|e| {
        warn!(path = %path.display(), "T50 unavailable: {}", e);
        0.0
    });
    let t100 = find_t100(&times, &percents);
    if t100 == 0.0 {
        warn!(path = %path.display(), "T100 unavailable");
    }
    RunEstimate { path, t50, t100 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const TIMES: [f64; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];

    #[test]
    fn t50_interpolates_across_crossing_pair() {
        let t = interpolate_t50(&TIMES, &[10.0, 30.0, 48.0, 55.0, 80.0], HALF_ERASED).unwrap();
        assert!((t - (2.0 + 2.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn t50_clamps_first_sample_crossing() {
        // Extrapolated back along the first two samples: 60 at t=0, 70 at t=1
        let t = interpolate_t50(&[0.0, 1.0], &[60.0, 70.0], HALF_ERASED).unwrap();
        assert!((t + 1.0).abs() < 1e-9);
    }

    #[test]
    #[traced_test]
    fn t50_advances_over_plateau_with_warning() {
        let t = interpolate_t50(&TIMES, &[50.0, 50.0, 60.0, 70.0, 90.0], HALF_ERASED).unwrap();
        // Pair (t=1, 50%) .. (t=2, 60%)
        assert!((t - 1.0).abs() < 1e-9);
        assert!(logs_contain("plateau"));

        assert!(interpolate_t50(&[0.0, 1.0], &[60.0, 60.0], HALF_ERASED).is_err());
    }

    #[test]
    fn t50_fails_when_threshold_never_reached() {
        assert!(matches!(
            interpolate_t50(&TIMES, &[1.0, 2.0, 3.0, 4.0, 5.0], HALF_ERASED),
            Err(EetimeError::InterpolationFailed(_))
        ));
        assert!(interpolate_t50(&[0.0], &[100.0], HALF_ERASED).is_err());
    }

    #[test]
    fn t100_is_start_of_final_streak() {
        let percents = [20.0, 100.0, 99.0, 100.0, 100.0];
        assert_eq!(find_t100(&TIMES, &percents), 3.0);
    }

    #[test]
    #[traced_test]
    fn t100_degenerate_series_are_zero() {
        assert_eq!(find_t100(&[], &[]), 0.0);
        assert_eq!(find_t100(&TIMES, &[10.0, 100.0, 100.0, 100.0, 99.0]), 0.0);
        assert!(logs_contain("never settled"));
        assert_eq!(find_t100(&[0.0, 1.0], &[100.0, 100.0]), 0.0);
    }
}
