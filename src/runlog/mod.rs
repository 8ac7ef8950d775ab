//! Run log format
//!
//! The newline-delimited JSON format shared by the sampler and every analysis tool.
//! A log is one `header`, zero or more `read` samples, then either a `footer`
//! (completed run) or a `timeout` record (aborted run).

pub mod reader;
pub mod record;
pub mod snapshot;
pub mod writer;

pub use reader::{
    collect_run_paths, find_log_dirs, list_logs, load_complete_runs, load_run, RunLog,
};
pub use record::{Footer, Header, ReadSample, Record, TimeoutRecord};
pub use writer::RunLogWriter;
