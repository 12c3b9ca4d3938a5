//! The run's stages, each with its own failure policy.
//!
//! | Stage  | Failure policy |
//! |--------|----------------|
//! | commit | recovered: logged, run continues |
//! | issue  | recovered: logged; a created-but-unclosed issue is logged at `error` |
//! | change | branch/content/pull request/merge fatal; reviewers, review, branch deletion recovered |

pub mod change;
pub mod commit;
pub mod issue;
