//! User interface module - console output of a run.
//!
//! All printing lives in [`formatter`]; the library itself only logs.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_error, display_failure, display_plan, display_status,
    display_step_records, display_success, display_summary,
};
