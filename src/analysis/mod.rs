//! Offline analysis
//!
//! - `extract` - T50 interpolation and T100 backward scan of one run
//! - `stats` - median, RMS and sample standard deviation
//! - `trial` - median-combined estimates over a trial's repeated runs
//! - `identity` - serial number to vendor/model table
//! - `report` - per-trial CSV table with bulb normalization
//! - `aggregate` - per-product population statistics

pub mod aggregate;
pub mod extract;
pub mod identity;
pub mod report;
pub mod stats;
pub mod trial;

pub use aggregate::{aggregate, run_aggregate, ProductStats, TrialRecord};
pub use extract::{analyze_run, find_t100, interpolate_t50, RunEstimate, HALF_ERASED};
pub use identity::{Identity, IdentityTable};
pub use report::{generate_table, normalize, ReportSummary, TableOptions, TrialRow};
pub use trial::{analyze_trial, TrialSummary};

/// Serialize seconds with one decimal place in CSV output.
pub(crate) mod one_decimal {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{value:.1}"))
    }
}
