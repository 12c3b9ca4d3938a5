//! Commit Stage: append generated lines to an activity file on the default
//! branch, then commit and push. Never aborts the run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{info, warn};

use crate::core::content::{WorkingChange, plan_working_change};
use crate::core::types::RunContext;
use crate::io::git::Vcs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { path: String, message: String },
    Skipped { reason: String },
}

pub fn run_commit_stage<V: Vcs, R: Rng + ?Sized>(
    ctx: &RunContext,
    vcs: &V,
    rng: &mut R,
) -> CommitOutcome {
    if let Err(err) = prepare_working_copy(ctx, vcs) {
        warn!(error = %format!("{err:#}"), "working copy not ready, skipping default-branch commit");
        return CommitOutcome::Skipped {
            reason: format!("{err:#}"),
        };
    }

    let Some(change) = plan_working_change(rng, ctx.started_at, &ctx.layout.activity_files)
    else {
        warn!("no activity files configured, skipping default-branch commit");
        return CommitOutcome::Skipped {
            reason: "no activity files configured".to_string(),
        };
    };

    match record_and_publish(ctx, vcs, &change) {
        Ok(()) => {
            info!(
                path = %change.path,
                lines = change.lines.len(),
                branch = %ctx.default_branch,
                "default-branch commit pushed"
            );
            CommitOutcome::Committed {
                path: change.path,
                message: change.message,
            }
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "nothing committed or pushed on the default branch");
            CommitOutcome::Skipped {
                reason: format!("{err:#}"),
            }
        }
    }
}

fn prepare_working_copy<V: Vcs>(ctx: &RunContext, vcs: &V) -> Result<()> {
    vcs.configure_identity(&ctx.committer)
        .context("configure git identity")?;
    vcs.checkout(&ctx.default_branch)
        .with_context(|| format!("checkout {}", ctx.default_branch))?;
    Ok(())
}

fn record_and_publish<V: Vcs>(ctx: &RunContext, vcs: &V, change: &WorkingChange) -> Result<()> {
    append_activity(vcs.workdir(), change)?;
    vcs.add(&change.path)?;
    vcs.commit(&change.message)?;
    vcs.push(&ctx.layout.remote, &ctx.default_branch)?;
    Ok(())
}

/// Append the payload, creating the file and its parent directories if needed.
fn append_activity(root: &Path, change: &WorkingChange) -> Result<()> {
    let path = root.join(&change.path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(change.payload().as_bytes())
        .with_context(|| format!("append to {}", path.display()))?;
    Ok(())
}
