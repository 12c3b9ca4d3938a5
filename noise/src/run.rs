//! One run: commit, gated issue, gated change cycle.

use anyhow::Result;
use rand::Rng;
use tracing::info;

use crate::core::gate::roll;
use crate::core::types::RunContext;
use crate::io::git::Vcs;
use crate::io::github::Platform;
use crate::report::RunReport;
use crate::stages::change::{ChangeOutcome, run_change_stage};
use crate::stages::commit::run_commit_stage;
use crate::stages::issue::{IssueOutcome, run_issue_stage};

/// Execute the stages in order and collect what happened.
///
/// Each gate is rolled exactly once, right before its stage. Only the change
/// stage can fail the run.
pub fn run_pipeline<V: Vcs, P: Platform, R: Rng + ?Sized>(
    ctx: &RunContext,
    vcs: &V,
    platform: &P,
    rng: &mut R,
) -> Result<RunReport> {
    let commit = run_commit_stage(ctx, vcs, rng);

    let issue_gate = roll(rng, ctx.issue_probability);
    let issue = if issue_gate.passed {
        run_issue_stage(ctx, platform, rng)
    } else {
        info!(
            draw = issue_gate.draw,
            threshold = issue_gate.threshold.percent(),
            "issue stage skipped"
        );
        IssueOutcome::Skipped(issue_gate)
    };

    let change_gate = roll(rng, ctx.change_probability);
    let change = if change_gate.passed {
        run_change_stage(ctx, vcs, platform, rng)?
    } else {
        info!(
            draw = change_gate.draw,
            threshold = change_gate.threshold.percent(),
            "change stage skipped"
        );
        ChangeOutcome::Skipped(change_gate)
    };

    Ok(RunReport {
        repo: ctx.repo.slug(),
        commit,
        issue,
        change,
    })
}
