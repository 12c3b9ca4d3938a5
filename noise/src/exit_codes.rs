//! Stable exit codes for the `noise` binary.

/// Run completed; optional stages may have been skipped or degraded.
pub const OK: i32 = 0;
/// Missing/invalid configuration or an unrecovered stage failure.
pub const FAILURE: i32 = 1;
