//! # eetime
//!
//! Measures how long a UV-erasable memory device takes to erase. A paced sampling loop
//! reads the device through an external programmer and appends every sample to a
//! newline-delimited JSON run log; offline tools derive T50 (time to 50% erased) and
//! T100 (time to stably 100% erased) per run, combine repeated runs by median, and
//! aggregate populations of trials by vendor and device.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: The sampling loop controller, its per-tick hysteresis state and
//!   multi-pass collect sessions.
//! - **`analysis`**: T50/T100 extraction, trial medians, the per-trial CSV table and the
//!   cross-run aggregator.
//! - **`classifier`**: Decides whether a memory image reads fully erased.
//! - **`config`**: Layered configuration (defaults, TOML file, `EETIME__` environment).
//! - **`error`**: The crate-wide `EetimeError` and `AppResult` alias.
//! - **`hardware`**: The `MemoryDevice` capability trait, the `minipro` driver and a
//!   simulated device.
//! - **`logging`**: `tracing-subscriber` setup.
//! - **`runlog`**: The run log record types, snapshot codec, reader and writer.
//! - **`tools`**: Zeroing, erase checks, snapshot extraction and header annotation.

pub mod acquisition;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod runlog;
pub mod tools;
