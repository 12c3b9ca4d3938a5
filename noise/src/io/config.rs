//! Optional repository-level configuration (`.github/noise.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::types::{BranchStrategy, RepoLayout};

pub const DEFAULT_CONFIG_PATH: &str = ".github/noise.toml";

/// Bot configuration (TOML).
///
/// Meant to be committed next to the workflow that schedules the bot.
/// Missing fields default to the values the bot has always used.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseConfig {
    /// Candidate files for the default-branch commit, relative to the repo root.
    pub activity_files: Vec<String>,

    /// Git remote used for pushes and default-branch detection.
    pub remote: String,

    /// Generated branches are named `<branch_prefix>/<unix-millis>`.
    pub branch_prefix: String,

    /// Directory receiving one seed file per generated branch.
    pub seed_dir: String,

    pub branch_strategy: BranchStrategy,

    /// Per-request timeout for GitHub API calls.
    pub request_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            activity_files: vec![
                "activity.log".to_string(),
                "docs/activity.md".to_string(),
                "notes/heartbeat.txt".to_string(),
            ],
            remote: "origin".to_string(),
            branch_prefix: "noise".to_string(),
            seed_dir: "branches".to_string(),
            branch_strategy: BranchStrategy::Git,
            request_timeout_secs: 30,
            user_agent: "noise-bot".to_string(),
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.activity_files.is_empty() {
            return Err(anyhow!("activity_files must be a non-empty array"));
        }
        for file in &self.activity_files {
            let path = Path::new(file);
            if file.trim().is_empty() || path.is_absolute() || file.contains("..") {
                return Err(anyhow!(
                    "activity_files entry '{file}' must be a relative path inside the repository"
                ));
            }
        }
        if self.remote.trim().is_empty() {
            return Err(anyhow!("remote must not be empty"));
        }
        if self.branch_prefix.trim_matches('/').trim().is_empty() {
            return Err(anyhow!("branch_prefix must not be empty"));
        }
        if let Some(bad) = self
            .branch_prefix
            .chars()
            .find(|c| c.is_whitespace() || "~^:?*[\\#".contains(*c))
        {
            return Err(anyhow!(
                "branch_prefix '{}' contains '{bad}', which is not allowed in a branch name",
                self.branch_prefix
            ));
        }
        if self.seed_dir.trim_matches('/').trim().is_empty() {
            return Err(anyhow!("seed_dir must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(anyhow!("user_agent must not be empty"));
        }
        Ok(())
    }

    pub fn layout(&self) -> RepoLayout {
        RepoLayout {
            activity_files: self.activity_files.clone(),
            remote: self.remote.clone(),
            branch_prefix: self.branch_prefix.clone(),
            seed_dir: self.seed_dir.clone(),
            branch_strategy: self.branch_strategy,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `NoiseConfig::default()`.
pub fn load_config(path: &Path) -> Result<NoiseConfig> {
    if !path.exists() {
        let cfg = NoiseConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: NoiseConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
