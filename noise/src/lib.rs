//! Scheduled synthetic repository activity agent.
//!
//! One invocation performs one run against a GitHub repository and its local
//! working copy: a commit on the default branch, an optional issue that is
//! opened and closed, and an optional branch → pull request → review → merge
//! → cleanup cycle. The architecture keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (gates, generated content, error
//!   classification). No I/O, driven by an injected random source.
//! - **[`io`]**: Side-effecting adapters (`git` subprocesses, GitHub REST,
//!   configuration files, process environment). Each sits behind a trait so
//!   stages can be tested with recording fakes.
//!
//! Orchestration modules ([`resolve`], [`stages`], [`run`], [`report`])
//! coordinate core logic with I/O to implement a single run.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod resolve;
pub mod run;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
