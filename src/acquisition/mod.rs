//! Acquisition
//!
//! - `state` - per-tick hysteresis state threaded through the loop
//! - `controller` - the paced sampling loop writing one run log
//! - `session` - multi-pass sessions and output directory naming

pub mod controller;
pub mod session;
pub mod state;

pub use controller::{format_hms, wait_erased, SamplerSettings};
pub use session::{
    default_postfix, default_run_dir, interval_from_secs, run_session, CollectOptions,
    RunMetadata,
};
pub use state::{RunStatus, SamplingState, TickReport};
