//! Pipeline entry points for monitor operations.
//!
//! - `run_monitor`: Fetch sources, diff against the seen set, notify, persist
//! - `calculate_diff`: Pure new-identifier computation used by the run

pub mod diff;
pub mod run;

pub use diff::{DiffResult, calculate_diff, merge_seen};
pub use run::{RunReport, run_monitor};
