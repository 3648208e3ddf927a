//! Terminal output helpers
//!
//! Human-readable command output goes to stdout through these helpers;
//! logs go to stderr through `tracing`. Output degrades to plain ASCII
//! markers when stdout is not a terminal or a CI environment is detected.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    header, key_value, key_value_status, section, step_error_detail, step_ok, step_ok_detail,
    step_warn, step_warn_hint, summary,
};
