//! Serial number to (vendor, model) identity table.
//!
//! A CSV with a header row and one `sn,vendor,model` triple per line. Column names are
//! not interpreted; position is. Serial numbers are uppercased to match loaded headers.

use crate::error::{AppResult, EetimeError};
use std::collections::BTreeMap;
use std::path::Path;

/// Vendor and model of one serial-numbered part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Manufacturer
    pub vendor: String,
    /// Part model, e.g. `Am2716`
    pub model: String,
}

/// Serial number to [`Identity`] mapping, keyed by uppercased serial.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    entries: BTreeMap<String, Identity>,
}

impl IdentityTable {
    /// Load a `sn,vendor,model` CSV with a header row.
    pub fn load(path: &Path) -> AppResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_reader(reader)
    }

    /// Build the table from an already configured CSV reader.
    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> AppResult<Self> {
        let mut entries = BTreeMap::new();
        for row in reader.deserialize() {
            let (sn, vendor, model): (String, String, String) = row?;
            if sn.is_empty() {
                return Err(EetimeError::Configuration(
                    "identity table row with empty serial number".to_string(),
                ));
            }
            entries.insert(sn.to_uppercase(), Identity { vendor, model });
        }
        tracing::debug!(entries = entries.len(), "Loaded identity table");
        Ok(Self { entries })
    }

    /// Look up a serial number, case-insensitively.
    pub fn lookup(&self, sn: &str) -> Option<&Identity> {
        self.entries.get(&sn.to_uppercase())
    }

    /// Number of serial numbers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
