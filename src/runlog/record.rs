//! Run log records.
//!
//! One JSON object per line, discriminated by its `type` field:
//!
//! ```text
//! {"type": "header", "prog": "minipro", "prog_dev": "2716", "interval": 3.0, ...}
//! {"type": "read", "iter": 1, "seconds": 0.0, "erase_percent": 12.5, ...}
//! {"type": "footer", "erase_time": 210.0, "run_time": 264.0, "half_erase_time": 131.9}
//! ```
//!
//! A run that hit its timeout ends with a `timeout` record instead of a footer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Encoding tag stored next to every snapshot.
pub const READ_META_ZLIB: &str = "zlib";

/// Record tags understood by this reader.
pub const KNOWN_TAGS: [&str; 4] = ["header", "read", "footer", "timeout"];

/// One line of a run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    /// First line of every log
    Header(Header),
    /// One sample per tick
    Read(ReadSample),
    /// Last line of a completed run
    Footer(Footer),
    /// Last line of a run that exceeded its timeout
    Timeout(TimeoutRecord),
}

impl Record {
    /// The `type` tag this record serializes with.
    pub fn tag(&self) -> &'static str {
        match self {
            Record::Header(_) => "header",
            Record::Read(_) => "read",
            Record::Footer(_) => "footer",
            Record::Timeout(_) => "timeout",
        }
    }
}

/// Run metadata, written once before any sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Programmer identity (`minipro`, `mock`)
    pub prog: String,
    /// Device name as given to the programmer
    pub prog_dev: String,
    /// UTC start time
    pub datetime: NaiveDateTime,
    /// Configured minimum seconds between reads
    pub interval: f64,
    /// Configured completion threshold, percent of elapsed ticks
    pub erased_threshold: f64,
    /// Operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Serial number; uppercased when a log is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
    /// Eraser fixture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eraser: Option<String>,
    /// Bulb id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulb: Option<String>,
    /// Encoded snapshot of the device taken before the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
}

/// One sample of the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadSample {
    /// 1-based tick index
    pub iter: u64,
    /// Elapsed seconds since the run started, taken at the start of the tick
    pub seconds: f64,
    /// Encoded memory image
    pub read: String,
    /// Encoding of `read`
    #[serde(default = "default_read_meta")]
    pub read_meta: String,
    /// Length of the trailing erased streak as a percent of all ticks so far
    pub complete_percent: f64,
    /// Percent of bits set
    pub erase_percent: f64,
    /// Every bit set
    pub erased: bool,
}

fn default_read_meta() -> String {
    READ_META_ZLIB.to_string()
}

/// Run summary, written when the run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    /// Elapsed seconds at the first tick of the final unbroken erased streak
    pub erase_time: Option<f64>,
    /// Elapsed seconds at the tick that satisfied the completion threshold
    pub run_time: f64,
    /// Elapsed seconds when the image first read at least 50% erased
    pub half_erase_time: Option<f64>,
    /// Seconds spent zeroing the device before the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prog_time: Option<f64>,
}

/// Marker appended when a run exceeds its timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutRecord {
    /// Tick that would have been taken next
    pub iter: u64,
    /// Elapsed seconds when the timeout was detected
    pub seconds: f64,
}
