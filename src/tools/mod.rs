//! Peripheral operations behind the `zero`, `check`, `extract` and `annotate` commands.

pub mod annotate;
pub mod device;
pub mod extract;

pub use annotate::{annotate_dir, annotate_file};
pub use device::{check, check_loop, zero};
pub use extract::{hexdump, initial_snapshot, resolve_log};
