//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod intervals;
pub mod models;
pub mod samples;
pub mod utils;

// Re-export main command functions
pub use intervals::{execute_intervals, load_elements, validate_intervals_args};
pub use models::{IntervalsArgs, SamplesArgs};
pub use samples::{execute_samples, validate_samples_args};
pub use utils::{display_schema, display_version, validate_report_file};
