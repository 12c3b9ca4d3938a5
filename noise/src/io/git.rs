//! Git adapter for the working copy.
//!
//! Stages talk to the working copy through [`Vcs`] so their failure policy can
//! be tested without a repository. [`Git`] is the production implementation:
//! a small, explicit wrapper around `git` subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::types::Committer;

/// Local version-control operations needed by a run.
pub trait Vcs {
    /// Root of the working copy; activity files are relative to it.
    fn workdir(&self) -> &Path;
    fn configure_identity(&self, committer: &Committer) -> Result<()>;
    /// Default branch advertised by `remote` (its symbolic `HEAD`).
    fn remote_default_branch(&self, remote: &str) -> Result<String>;
    fn checkout(&self, branch: &str) -> Result<()>;
    /// Create `branch` at `start_point` and switch to it.
    fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<()>;
    fn add(&self, path: &str) -> Result<()>;
    fn commit(&self, message: &str) -> Result<()>;
    fn push(&self, remote: &str, branch: &str) -> Result<()>;
    /// Push and set upstream tracking.
    fn push_upstream(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim(), "git {}", args.join(" "));
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "git {}", args.join(" "));
        }
        if !output.status.success() {
            // "nothing to commit" is reported on stdout, real errors on stderr.
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(anyhow!("git {} failed: {}", args.join(" "), detail));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl Vcs for Git {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[instrument(skip_all, fields(name = %committer.name))]
    fn configure_identity(&self, committer: &Committer) -> Result<()> {
        self.run_checked(&["config", "user.name", &committer.name])?;
        self.run_checked(&["config", "user.email", &committer.email])?;
        Ok(())
    }

    #[instrument(skip_all, fields(remote))]
    fn remote_default_branch(&self, remote: &str) -> Result<String> {
        let symbolic = format!("refs/remotes/{remote}/HEAD");
        let out = self.run_capture(&["symbolic-ref", "--short", &symbolic])?;
        let name = strip_remote_prefix(out.trim(), remote);
        if name.is_empty() {
            return Err(anyhow!("{symbolic} resolved to an empty branch name"));
        }
        debug!(branch = %name, "remote default branch");
        Ok(name)
    }

    #[instrument(skip_all, fields(branch))]
    fn checkout(&self, branch: &str) -> Result<()> {
        debug!(branch, "checking out branch");
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch, start_point))]
    fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        debug!(branch, start_point, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch, start_point])?;
        Ok(())
    }

    fn add(&self, path: &str) -> Result<()> {
        self.run_checked(&["add", "--", path])?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> Result<()> {
        self.run_checked(&["commit", "-m", message])?;
        Ok(())
    }

    #[instrument(skip_all, fields(remote, branch))]
    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run_checked(&["push", remote, branch])?;
        Ok(())
    }

    #[instrument(skip_all, fields(remote, branch))]
    fn push_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        self.run_checked(&["push", "-u", remote, branch])?;
        Ok(())
    }
}

/// `origin/main` -> `main` (names without the prefix pass through).
fn strip_remote_prefix(short_ref: &str, remote: &str) -> String {
    short_ref
        .strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(short_ref)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_remote_prefix() {
        assert_eq!(strip_remote_prefix("origin/main", "origin"), "main");
        assert_eq!(
            strip_remote_prefix("origin/release/2.x", "origin"),
            "release/2.x"
        );
    }

    #[test]
    fn keeps_names_without_prefix() {
        assert_eq!(strip_remote_prefix("trunk", "origin"), "trunk");
        assert_eq!(strip_remote_prefix("originals", "origin"), "originals");
    }
}
