//! Outcome Reporter: turns stage outcomes into the run's summary line.

use std::fmt;

use tracing::info;

use crate::stages::change::{ChangeOutcome, ReviewOutcome};
use crate::stages::commit::CommitOutcome;
use crate::stages::issue::IssueOutcome;

/// Final line printed by a successful run.
pub const SUCCESS_LINE: &str = "noise generated successfully";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub repo: String,
    pub commit: CommitOutcome,
    pub issue: IssueOutcome,
    pub change: ChangeOutcome,
}

impl RunReport {
    /// Print the summary and the terminal success line to stdout.
    pub fn emit(&self) {
        info!(summary = %self, "run finished");
        println!("{self}");
        println!("{SUCCESS_LINE}");
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repo={} commit=", self.repo)?;
        match &self.commit {
            CommitOutcome::Committed { path, .. } => write!(f, "committed({path})")?,
            CommitOutcome::Skipped { .. } => write!(f, "skipped")?,
        }

        write!(f, " issue=")?;
        match &self.issue {
            IssueOutcome::Skipped(_) => write!(f, "skipped")?,
            IssueOutcome::Closed { number } => write!(f, "closed(#{number})")?,
            IssueOutcome::Failed { .. } => write!(f, "failed")?,
            IssueOutcome::LeftOpen { number, .. } => write!(f, "left-open(#{number})")?,
        }

        write!(f, " change=")?;
        match &self.change {
            ChangeOutcome::Skipped(_) => write!(f, "skipped"),
            ChangeOutcome::Merged {
                branch,
                pull_number,
                review,
                branch_deleted,
            } => {
                let review = match review {
                    ReviewOutcome::Approved => "approved",
                    ReviewOutcome::Commented => "commented",
                    ReviewOutcome::CommentedAfterSelfApproval => "commented-after-self-approval",
                    ReviewOutcome::Missing { .. } => "missing",
                };
                write!(
                    f,
                    "merged(#{pull_number}) branch={branch} review={review} branch_deleted={branch_deleted}"
                )
            }
        }
    }
}
