//! Shared types describing one run.
//!
//! [`RunContext`] is built once by the resolver and handed by reference to
//! every stage; no stage reads ambient configuration directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;
use crate::core::gate::Probability;

/// `owner/name` pair identifying the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    /// Parse the `owner/name` form injected by CI (e.g. `GITHUB_REPOSITORY`).
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidRepository(trimmed.to_string()))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ConfigError::InvalidRepository(trimmed.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Identity stamped on local commits and on content written through the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

/// Disposition requested for the pull-request review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// Try to approve; fall back to a comment on self-approval rejection.
    Approve,
    /// Leave a commenting review only.
    Comment,
}

/// Review disposition as understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    Comment,
}

impl ReviewEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Comment => "COMMENT",
        }
    }
}

impl From<ReviewMode> for ReviewEvent {
    fn from(mode: ReviewMode) -> Self {
        match mode {
            ReviewMode::Approve => Self::Approve,
            ReviewMode::Comment => Self::Comment,
        }
    }
}

/// How the Change Stage creates its branch on the remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchStrategy {
    /// `git checkout -b` + `git push -u` from the working copy.
    #[default]
    Git,
    /// Look up the default-branch tip and create the ref through the API.
    Api,
}

/// Repository layout knobs that come from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    /// Candidate files for the default-branch commit.
    pub activity_files: Vec<String>,
    /// Git remote to push to.
    pub remote: String,
    /// Prefix of generated branch names (`<prefix>/<millis>`).
    pub branch_prefix: String,
    /// Directory receiving the seed file of each generated branch.
    pub seed_dir: String,
    pub branch_strategy: BranchStrategy,
}

/// Immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub repo: Repository,
    pub default_branch: String,
    pub committer: Committer,
    pub issue_probability: Probability,
    pub change_probability: Probability,
    pub review_mode: ReviewMode,
    /// Logins asked to review the generated pull request (may be empty).
    pub reviewers: Vec<String>,
    pub layout: RepoLayout,
    /// Wall-clock instant the run started; every generated timestamp and the
    /// branch name derive from it.
    pub started_at: DateTime<Utc>,
}
