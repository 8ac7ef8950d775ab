//! Cross-run aggregation of the per-trial table.
//!
//! Trials are grouped by (vendor, device). Within a group each metric independently
//! drops zero (failed) entries, then reports RMS and sample standard deviation.

use crate::analysis::one_decimal;
use crate::analysis::stats::{rms, sample_stdev};
use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

/// The per-trial columns the aggregator reads; all others are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrialRecord {
    /// Serial number, possibly empty
    pub sn: String,
    /// Manufacturer
    pub vendor: String,
    /// Device model
    pub device: String,
    /// Bulb-normalized T50 in seconds; 0 marks a failed estimate
    pub t50_norm: f64,
    /// Bulb-normalized T100 in seconds; 0 marks a failed estimate
    pub t100_norm: f64,
}

/// Column names of the aggregate report, in [`ProductStats`] field order.
pub const REPORT_COLUMNS: [&str; 8] = [
    "Vendor",
    "Device",
    "T50 RMS (sec)",
    "T50 stdev (sec)",
    "T100 RMS (sec)",
    "T100 stdev (sec)",
    "N",
    "S/Ns",
];

/// One row of the aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStats {
    /// Manufacturer
    #[serde(rename = "Vendor")]
    pub vendor: String,
    /// Device model
    #[serde(rename = "Device")]
    pub device: String,
    /// RMS of the valid normalized T50 values
    #[serde(rename = "T50 RMS (sec)", with = "one_decimal")]
    pub t50_rms: f64,
    /// Sample standard deviation of the valid normalized T50 values
    #[serde(rename = "T50 stdev (sec)", with = "one_decimal")]
    pub t50_stdev: f64,
    /// RMS of the valid normalized T100 values
    #[serde(rename = "T100 RMS (sec)", with = "one_decimal")]
    pub t100_rms: f64,
    /// Sample standard deviation of the valid normalized T100 values
    #[serde(rename = "T100 stdev (sec)", with = "one_decimal")]
    pub t100_stdev: f64,
    /// Trials contributing to the better-populated metric
    #[serde(rename = "N")]
    pub n: usize,
    /// Distinct non-empty serial numbers, sorted
    #[serde(rename = "S/Ns", serialize_with = "join_sns")]
    pub sns: Vec<String>,
}

fn join_sns<S: serde::Serializer>(sns: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&sns.join(", "))
}

fn valid(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values.filter(|x| x.is_finite() && *x != 0.0).collect()
}

/// Group trials by (vendor, device), sorted ascending.
pub fn aggregate(records: &[TrialRecord]) -> Vec<ProductStats> {
    let mut products: BTreeMap<(&str, &str), Vec<&TrialRecord>> = BTreeMap::new();
    for record in records {
        products
            .entry((record.vendor.as_str(), record.device.as_str()))
            .or_default()
            .push(record);
    }

    products
        .into_iter()
        .map(|((vendor, device), rows)| {
            let t50s = valid(rows.iter().map(|r| r.t50_norm));
            let t100s = valid(rows.iter().map(|r| r.t100_norm));
            let sns: BTreeSet<&str> = rows
                .iter()
                .map(|r| r.sn.as_str())
                .filter(|sn| !sn.is_empty())
                .collect();
            ProductStats {
                vendor: vendor.to_string(),
                device: device.to_string(),
                t50_rms: rms(&t50s),
                t50_stdev: sample_stdev(&t50s),
                t100_rms: rms(&t100s),
                t100_stdev: sample_stdev(&t100s),
                n: t50s.len().max(t100s.len()),
                sns: sns.into_iter().map(String::from).collect(),
            }
        })
        .collect()
}

/// Read the per-trial table at `path`, keeping only the columns the aggregator uses.
pub fn read_trials(path: &Path) -> AppResult<Vec<TrialRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Write the aggregate report. The header row is written even when there are no products.
pub fn write_report(path: &Path, products: &[ProductStats]) -> AppResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(REPORT_COLUMNS)?;
    for product in products {
        writer.serialize(product)?;
    }
    writer.flush()?;
    Ok(())
}

/// Aggregate the per-trial table at `input` into the report at `output`.
///
/// Returns the number of products written.
pub fn run_aggregate(input: &Path, output: &Path) -> AppResult<usize> {
    let records = read_trials(input)?;
    let products = aggregate(&records);
    info!("Found {} products", products.len());
    write_report(output, &products)?;
    info!("Wrote {}", output.display());
    Ok(products.len())
}
