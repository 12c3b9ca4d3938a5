//! I/O adapters used by the stages.

pub mod config;
pub mod git;
pub mod github;
pub mod settings;
