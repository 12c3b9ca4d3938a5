//! Process-environment surface of the bot.
//!
//! Every value can come from the environment variable CI already injects or
//! from the matching long flag. Values stay raw strings here; interpreting
//! them (clamping, defaults, validation) is the resolver's job.

use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Default, Args)]
pub struct Settings {
    /// API token used for every GitHub call.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Target repository in `owner/name` form.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// GitHub API base URL (GitHub Enterprise or a test server).
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Skip default-branch detection and use this branch.
    #[arg(long, env = "DEFAULT_BRANCH")]
    pub default_branch: Option<String>,

    #[arg(long, env = "GIT_USER_NAME")]
    pub git_user_name: Option<String>,

    #[arg(long, env = "GIT_USER_EMAIL")]
    pub git_user_email: Option<String>,

    /// Chance (0-100) of opening and closing an issue.
    #[arg(long, env = "NOISE_ISSUE_PROBABILITY", allow_hyphen_values = true)]
    pub issue_probability: Option<String>,

    /// Chance (0-100) of running the branch/pull-request cycle.
    #[arg(long, env = "NOISE_PR_PROBABILITY", allow_hyphen_values = true)]
    pub pr_probability: Option<String>,

    /// Try to approve the generated pull request (`true`, `1`, `yes`, `on`).
    #[arg(long, env = "NOISE_APPROVE")]
    pub approve: Option<String>,

    /// Comma-separated logins to request as reviewers.
    #[arg(long, env = "NOISE_REVIEWERS")]
    pub reviewers: Option<String>,

    /// Path of the TOML config file.
    #[arg(long, env = "NOISE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Trimmed value, or `None` when unset or blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Interpret a boolean-ish setting; anything unrecognised is `false`.
pub fn parse_flag(raw: Option<&str>) -> bool {
    non_blank(raw).is_some_and(|value| {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Split a comma-separated login list, dropping blanks.
pub fn parse_reviewers(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .map(str::to_string)
        .collect()
}
