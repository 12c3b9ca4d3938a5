//! Deterministic, pure logic shared by the stages.
//!
//! Core modules must be free of I/O side effects. Anything random takes the
//! random source as an argument so tests can seed it and assert exact output.

pub mod classify;
pub mod content;
pub mod errors;
pub mod gate;
pub mod types;
